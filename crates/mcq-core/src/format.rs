//! Markdown rendering of a [`RepoContext`] for inclusion in prompts.
//!
//! This is the only formatter for repository context; the template engine
//! exposes it as the `format_context` helper.

use std::fmt::Write;

use crate::context::RepoContext;

pub const MAX_DEPENDENCIES: usize = 10;
pub const MAX_COMMITS: usize = 5;
pub const README_EXCERPT_CHARS: usize = 1000;
pub const CONFIG_EXCERPT_CHARS: usize = 500;

pub fn format_context(ctx: &RepoContext) -> String {
    let mut out = String::from("## Repository Context\n\n");

    out.push_str("### Project Information\n");
    let info = [
        ("Project Name", ctx.project_name.as_str()),
        ("Module Path", ctx.module_path.as_str()),
        ("Go Version", ctx.language_version.as_str()),
        ("Project Type", ctx.project_type.as_str()),
    ];
    for (label, value) in info {
        if !value.is_empty() {
            let _ = writeln!(out, "- **{label}**: {value}");
        }
    }
    out.push('\n');

    if !ctx.dependencies.is_empty() {
        out.push_str("### Key Dependencies\n");
        for dep in ctx.dependencies.iter().take(MAX_DEPENDENCIES) {
            let _ = writeln!(out, "- {dep}");
        }
        if ctx.dependencies.len() > MAX_DEPENDENCIES {
            let _ = writeln!(
                out,
                "- ... and {} more",
                ctx.dependencies.len() - MAX_DEPENDENCIES
            );
        }
        out.push('\n');
    }

    if !ctx.readme.trim().is_empty() {
        out.push_str("### Project Overview\n");
        out.push_str(&excerpt(ctx.readme.trim(), README_EXCERPT_CHARS));
        out.push_str("\n\n");
    }

    if !ctx.recent_commits.is_empty() {
        out.push_str("### Recent Development Activity\n");
        for commit in ctx.recent_commits.iter().take(MAX_COMMITS) {
            let _ = writeln!(out, "- {commit}");
        }
        out.push('\n');
    }

    if !ctx.directory_structure.is_empty() {
        out.push_str("### Project Structure\n```\n");
        out.push_str(&ctx.directory_structure);
        if !ctx.directory_structure.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n\n");
    }

    if !ctx.config_files.is_empty() {
        out.push_str("### Configuration Files\n");
        for (name, content) in &ctx.config_files {
            let _ = write!(
                out,
                "#### {name}\n```\n{}\n```\n\n",
                excerpt(content.trim_end(), CONFIG_EXCERPT_CHARS)
            );
        }
    }

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

/// First `max` characters of `text`, with `...` appended when cut.
pub fn excerpt(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProjectType;

    fn sample() -> RepoContext {
        RepoContext {
            project_name: "widgets".into(),
            module_path: "github.com/acme/widgets".into(),
            language_version: "1.22".into(),
            dependencies: (0..12).map(|i| format!("github.com/dep/{i}")).collect(),
            readme: "r".repeat(1500),
            recent_commits: (0..8).map(|i| format!("abc{i} commit {i}")).collect(),
            directory_structure: "cmd/\n  main.go\n".into(),
            config_files: [("Makefile".to_string(), "m".repeat(600))].into_iter().collect(),
            project_type: ProjectType::Cli,
        }
    }

    #[test]
    fn sections_in_fixed_order() {
        let s = format_context(&sample());
        let order = [
            "### Project Information",
            "### Key Dependencies",
            "### Project Overview",
            "### Recent Development Activity",
            "### Project Structure",
            "### Configuration Files",
        ];
        let positions: Vec<usize> = order.iter().map(|h| s.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(s.contains("- **Project Type**: CLI"));
    }

    #[test]
    fn lists_and_excerpts_are_capped() {
        let s = format_context(&sample());
        assert!(s.contains("github.com/dep/9\n"));
        assert!(!s.contains("github.com/dep/10\n"));
        assert!(s.contains("- ... and 2 more"));
        assert!(s.contains("abc4 commit 4"));
        assert!(!s.contains("abc5 commit 5"));
        assert!(s.contains(&format!("{}...", "r".repeat(1000))));
        assert!(!s.contains(&"r".repeat(1001)));
        assert!(s.contains(&format!("{}...", "m".repeat(500))));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let ctx = RepoContext {
            project_name: "solo".into(),
            ..Default::default()
        };
        let s = format_context(&ctx);
        assert!(s.contains("- **Project Name**: solo"));
        assert!(!s.contains("Key Dependencies"));
        assert!(!s.contains("Configuration Files"));
        assert!(s.ends_with('\n'));
    }

    #[test]
    fn excerpt_is_char_safe() {
        assert_eq!(excerpt("héllo", 2), "hé...");
        assert_eq!(excerpt("hi", 5), "hi");
    }
}
