//! Issue titles: ask the model, let the user confirm or override, and fall
//! back to a pattern scan of the story.

use serde::Serialize;

use crate::generate::Generator;
use crate::prompt::PromptConfig;
use crate::prompter::UserPrompter;

pub const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    Ai,
    UserOverride,
    PatternFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedTitle {
    pub source: TitleSource,
    pub text: String,
}

/// Cap `s` at [`MAX_TITLE_CHARS`], ending in `...` when cut.
pub fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_TITLE_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_TITLE_CHARS - 3).collect();
    out.push_str("...");
    out
}

/// Trim, drop leading heading markers, cap the length.
pub fn clean(raw: &str) -> String {
    let t = raw.trim().trim_start_matches('#').trim();
    truncate(t)
}

/// Derive a title from the story text alone.
pub fn pattern_fallback(story: &str, feature_request: &str) -> String {
    let lines: Vec<String> = story.lines().map(strip_markup).collect();

    for line in lines.iter().filter(|l| l.starts_with("As a")) {
        if let Some(start) = line.find("I want ") {
            let rest = &line[start + "I want ".len()..];
            if let Some(end) = rest.find(" so that") {
                let want = rest[..end].trim();
                if !want.is_empty() {
                    return truncate(want);
                }
            }
        }
    }

    if let Some(line) = lines
        .iter()
        .find(|l| l.starts_with("I want") || l.starts_with("User should"))
    {
        return truncate(line);
    }

    truncate(feature_request.trim())
}

fn strip_markup(line: &str) -> String {
    line.trim()
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '#' | '>') || c.is_whitespace())
        .replace("**", "")
}

/// Produce the title for `story`.
///
/// The model's suggestion is shown for confirmation. A declined or failed
/// suggestion leads to a manual title, and an empty manual title to the
/// pattern scan. Failures along the way never abort the flow.
pub async fn extract_title(
    generator: &Generator,
    prompter: &dyn UserPrompter,
    story: &str,
    feature_request: &str,
) -> ExtractedTitle {
    let config = PromptConfig::title_extraction(feature_request, story);
    match generator.generate(&config, &mut std::io::sink()).await {
        Ok(raw) => {
            let suggestion = clean(&raw);
            if !suggestion.is_empty() {
                let question = format!("Suggested title: {suggestion}\nUse this title?");
                match prompter.ask_yes_no(&question) {
                    Ok(true) => {
                        return ExtractedTitle {
                            source: TitleSource::Ai,
                            text: suggestion,
                        }
                    }
                    Ok(false) => {}
                    Err(e) => tracing::debug!(error = %e, "no confirmation read"),
                }
            }
        }
        Err(e) => tracing::warn!(code = %e.code, error = %e, "AI title extraction failed"),
    }

    let manual = prompter
        .ask_line("Enter a title (leave empty to derive one from the story)")
        .unwrap_or_default();
    let manual = manual.trim();
    if !manual.is_empty() {
        return ExtractedTitle {
            source: TitleSource::UserOverride,
            text: truncate(manual),
        };
    }

    ExtractedTitle {
        source: TitleSource::PatternFallback,
        text: pattern_fallback(story, feature_request),
    }
}
