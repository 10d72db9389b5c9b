//! Conversion between the Markdown that models write and JIRA wiki markup.
//!
//! [`markdown_to_wiki`] is applied to descriptions before they are sent to
//! JIRA. [`wiki_to_markdown`] is applied to issue text fetched for display;
//! running it on its own output changes nothing.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::{Captures, Regex};

// ---------------------------------------------------------------------------
// Markdown -> wiki
// ---------------------------------------------------------------------------

static MD_NUMBERED_RE: OnceLock<Regex> = OnceLock::new();
static MD_HEADING_RE: OnceLock<Regex> = OnceLock::new();

fn md_numbered_re() -> &'static Regex {
    MD_NUMBERED_RE.get_or_init(|| Regex::new(r"^( *)\d+\.\s+(.*)$").unwrap())
}

fn md_heading_re() -> &'static Regex {
    MD_HEADING_RE.get_or_init(|| Regex::new(r"^(#{2,6})\s+(.*)$").unwrap())
}

/// Convert Markdown to JIRA wiki markup, one line at a time.
///
/// Not idempotent on its own output: wiki bold `*x*` reads as Markdown
/// emphasis and becomes `_x_` on a second pass. Convert once, at the write
/// boundary.
pub fn markdown_to_wiki(md: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_code = false;

    for line in md.lines() {
        let trimmed = line.trim_start();
        if let Some(lang) = trimmed.strip_prefix("```") {
            if in_code {
                out.push("{code}".into());
                in_code = false;
            } else {
                let lang = lang.trim();
                out.push(if lang.is_empty() {
                    "{code}".into()
                } else {
                    format!("{{code:{lang}}}")
                });
                in_code = true;
            }
            continue;
        }
        if in_code {
            out.push(line.to_string());
            continue;
        }
        out.push(md_line_to_wiki(line));
    }

    let mut wiki = out.join("\n");
    if md.ends_with('\n') {
        wiki.push('\n');
    }
    wiki
}

fn md_line_to_wiki(line: &str) -> String {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let body = &line[indent..];

    if let Some(item) = body.strip_prefix("- ") {
        return format!("{} {}", "*".repeat(indent / 2 + 1), item);
    }
    if let Some(caps) = md_numbered_re().captures(line) {
        let depth = caps[1].len() / 2 + 1;
        return format!("{} {}", "#".repeat(depth), &caps[2]);
    }
    if let Some(caps) = md_heading_re().captures(line) {
        return format!("h{}. {}", caps[1].len(), &caps[2]);
    }

    let t = line.trim();
    if t.len() > 4 && t.starts_with("**") && t.ends_with("**") {
        return format!("*{}*", &t[2..t.len() - 2]);
    }
    if t.len() > 2 && t.starts_with('*') && t.ends_with('*') && !t.starts_with("**") {
        return format!("_{}_", &t[1..t.len() - 1]);
    }
    if t.len() > 2 && t.starts_with('`') && t.ends_with('`') && !t[1..t.len() - 1].contains('`') {
        return format!("{{{{{}}}}}", &t[1..t.len() - 1]);
    }
    line.to_string()
}

// ---------------------------------------------------------------------------
// User mentions
// ---------------------------------------------------------------------------

/// Looks up a display name for a JIRA account id.
pub trait UserResolver: Send + Sync {
    fn display_name(&self, account_id: &str) -> Option<String>;
}

/// Never resolves; mentions render as `@user-<suffix>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

impl UserResolver for NoResolver {
    fn display_name(&self, _account_id: &str) -> Option<String> {
        None
    }
}

/// Memoizes another resolver, failures included, for the life of the process.
pub struct UserCache<R> {
    inner: R,
    names: Mutex<HashMap<String, Option<String>>>,
}

impl<R: UserResolver> UserCache<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            names: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: UserResolver> UserResolver for UserCache<R> {
    fn display_name(&self, account_id: &str) -> Option<String> {
        if let Some(hit) = self.names.lock().ok().and_then(|m| m.get(account_id).cloned()) {
            return hit;
        }
        let name = self.inner.display_name(account_id);
        if let Ok(mut names) = self.names.lock() {
            names.insert(account_id.to_string(), name.clone());
        }
        name
    }
}

/// `@user-` plus the last eight characters of the account id.
pub fn anonymous_mention(account_id: &str) -> String {
    let chars: Vec<char> = account_id.chars().collect();
    let start = chars.len().saturating_sub(8);
    let suffix: String = chars[start..].iter().collect();
    format!("@user-{suffix}")
}

// ---------------------------------------------------------------------------
// Wiki -> markdown
// ---------------------------------------------------------------------------

static MENTION_RE: OnceLock<Regex> = OnceLock::new();
static SMART_LINK_RE: OnceLock<Regex> = OnceLock::new();
static MONOSPACE_RE: OnceLock<Regex> = OnceLock::new();
static WIKI_HEADING_RE: OnceLock<Regex> = OnceLock::new();
static WIKI_BULLET_RE: OnceLock<Regex> = OnceLock::new();
static KNOWN_TAG_RE: OnceLock<Regex> = OnceLock::new();
static ANY_TAG_RE: OnceLock<Regex> = OnceLock::new();
static CODE_OPEN_RE: OnceLock<Regex> = OnceLock::new();

fn mention_re() -> &'static Regex {
    MENTION_RE.get_or_init(|| Regex::new(r"\[~accountid:([^\]\s]+)\]").unwrap())
}

fn smart_link_re() -> &'static Regex {
    SMART_LINK_RE.get_or_init(|| {
        Regex::new(r"\[([^\[\]|<>]+)\|([^\[\]|\s<>]+)(?:\|smart-link)?\]").unwrap()
    })
}

fn monospace_re() -> &'static Regex {
    MONOSPACE_RE.get_or_init(|| Regex::new(r"\{\{([^{}]+?)\}\}").unwrap())
}

fn wiki_heading_re() -> &'static Regex {
    WIKI_HEADING_RE.get_or_init(|| Regex::new(r"^\s*h([1-6])\.\s+(.*)$").unwrap())
}

fn wiki_bullet_re() -> &'static Regex {
    WIKI_BULLET_RE.get_or_init(|| Regex::new(r"^(\*+)\s+(.*)$").unwrap())
}

fn known_tag_re() -> &'static Regex {
    KNOWN_TAG_RE.get_or_init(|| Regex::new(r"(?i)</?(?:br\s*/?|p|strong|em|b|i)>").unwrap())
}

fn any_tag_re() -> &'static Regex {
    ANY_TAG_RE.get_or_init(|| Regex::new(r"<[^<>]*>").unwrap())
}

fn code_open_re() -> &'static Regex {
    CODE_OPEN_RE.get_or_init(|| Regex::new(r"^\{(code|noformat)(?::([^}]*))?\}(.*)$").unwrap())
}

/// Convert wiki markup to Markdown, rendering mentions anonymously.
pub fn wiki_to_markdown(wiki: &str) -> String {
    wiki_to_markdown_with(wiki, &NoResolver)
}

enum Block {
    /// Inside a Markdown fence opened with this many backticks.
    Fence(usize),
    /// Inside a `{code}`/`{noformat}` block, buffering its body.
    Wiki {
        close: &'static str,
        lang: String,
        body: Vec<String>,
    },
}

pub fn wiki_to_markdown_with(wiki: &str, users: &dyn UserResolver) -> String {
    let normalized = wiki.replace("\r\n", "\n");
    let mut out: Vec<String> = Vec::new();
    let mut block: Option<Block> = None;

    for line in normalized.lines() {
        let trimmed = line.trim();

        match &mut block {
            Some(Block::Fence(open_len)) => {
                out.push(line.to_string());
                if closes_fence(trimmed, *open_len) {
                    block = None;
                }
                continue;
            }
            Some(Block::Wiki { close, body, .. }) => {
                match line.find(*close) {
                    Some(pos) => {
                        let before = &line[..pos];
                        if !before.trim().is_empty() {
                            body.push(before.to_string());
                        }
                        if let Some(Block::Wiki { lang, body, .. }) = block.take() {
                            push_fenced(&mut out, &lang, &body);
                        }
                    }
                    None => body.push(line.to_string()),
                }
                continue;
            }
            None => {}
        }

        let ticks = backtick_prefix(trimmed);
        if ticks >= 3 {
            out.push(line.to_string());
            block = Some(Block::Fence(ticks));
            continue;
        }

        if let Some(caps) = code_open_re().captures(trimmed) {
            let close = if &caps[1] == "code" {
                "{code}"
            } else {
                "{noformat}"
            };
            let lang = caps
                .get(2)
                .map(|m| code_language(m.as_str()))
                .unwrap_or_default();

            let rest = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            let (first, closed) = match rest.find(close) {
                Some(pos) => (&rest[..pos], true),
                None => (rest, false),
            };
            let mut body = Vec::new();
            if !first.trim().is_empty() {
                body.push(first.to_string());
            }
            if closed {
                push_fenced(&mut out, &lang, &body);
            } else {
                block = Some(Block::Wiki { close, lang, body });
            }
            continue;
        }

        out.push(wiki_line_to_markdown(line, users));
    }

    match block {
        Some(Block::Wiki { lang, body, .. }) => push_fenced(&mut out, &lang, &body),
        Some(Block::Fence(open_len)) => out.push("`".repeat(open_len)),
        None => {}
    }

    out.join("\n").trim().to_string()
}

fn backtick_prefix(line: &str) -> usize {
    line.chars().take_while(|&c| c == '`').count()
}

/// A closing fence is only backticks, at least as many as the opener.
fn closes_fence(trimmed: &str, open_len: usize) -> bool {
    let n = backtick_prefix(trimmed);
    n >= open_len && n == trimmed.len()
}

/// Emit a code block whose fence outruns every backtick run in the body.
fn push_fenced(out: &mut Vec<String>, lang: &str, body: &[String]) {
    let longest = body
        .iter()
        .map(|l| backtick_prefix(l.trim()))
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    out.push(format!("{fence}{lang}"));
    out.extend(body.iter().cloned());
    out.push(fence);
}

/// `go` from `go`, nothing from `title=Foo.java|borderStyle=solid`.
fn code_language(params: &str) -> String {
    let first = params.split('|').next().unwrap_or_default().trim();
    if first.contains('=') {
        String::new()
    } else {
        first.to_string()
    }
}

fn wiki_line_to_markdown(line: &str, users: &dyn UserResolver) -> String {
    let mut line = strip_html(line);

    if let Some(caps) = wiki_heading_re().captures(&line) {
        let level: usize = caps[1].parse().unwrap_or(1);
        line = format!("{} {}", "#".repeat(level), &caps[2]);
    } else if let Some(caps) = wiki_bullet_re().captures(&line) {
        let depth = caps[1].len();
        line = format!("{}- {}", "  ".repeat(depth - 1), &caps[2]);
    }

    let line = mention_re().replace_all(&line, |caps: &Captures| {
        let id = &caps[1];
        match users.display_name(id) {
            Some(name) if !name.trim().is_empty() => format!("@{}", sanitize_name(&name)),
            _ => anonymous_mention(id),
        }
    });

    let line = smart_link_re().replace_all(&line, |caps: &Captures| {
        let text = caps[1].trim();
        let raw_url = &caps[2];
        let Ok(url) = reqwest::Url::parse(raw_url) else {
            return caps[0].to_string();
        };
        let url = url.to_string();
        if text == raw_url || text == url {
            url
        } else {
            format!("[{text}]({url})")
        }
    });

    monospace_re().replace_all(&line, "`$1`").into_owned()
}

fn strip_html(line: &str) -> String {
    let mut s = known_tag_re().replace_all(line, "").into_owned();
    loop {
        let next = any_tag_re().replace_all(&s, "").into_owned();
        if next == s {
            return s;
        }
        s = next;
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | '[' | ']' | '{' | '}'))
        .collect::<String>()
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STORY_MD: &str = "- item\n  - sub\n**bold**\n```go\nx := 1\n```\n";
    const STORY_WIKI: &str = "* item\n** sub\n*bold*\n{code:go}\nx := 1\n{code}\n";

    #[test]
    fn markdown_story_converts_to_wiki() {
        assert_eq!(markdown_to_wiki(STORY_MD), STORY_WIKI);
    }

    #[test]
    fn wiki_story_converts_back_with_same_structure() {
        let md = wiki_to_markdown(STORY_WIKI);
        assert_eq!(md, "- item\n  - sub\n*bold*\n```go\nx := 1\n```");
    }

    #[test]
    fn outbound_line_rules() {
        let md = "    - deep\n1. first\n  1. nested\n## Heading\n### Sub\n*soft*\n`go test ./...`\nplain text";
        let wiki = markdown_to_wiki(md);
        assert_eq!(
            wiki,
            "*** deep\n# first\n## nested\nh2. Heading\nh3. Sub\n_soft_\n{{go test ./...}}\nplain text"
        );
    }

    #[test]
    fn outbound_leaves_code_bodies_alone() {
        let md = "```\n- not a list\n## not a heading\n```";
        assert_eq!(markdown_to_wiki(md), "{code}\n- not a list\n## not a heading\n{code}");
    }

    #[test]
    fn inbound_headings_monospace_and_noformat() {
        let wiki = "h1. Title\nh3. Part\nRun {{make test}} now\n{noformat}\n<raw> text\n{noformat}";
        assert_eq!(
            wiki_to_markdown(wiki),
            "# Title\n### Part\nRun `make test` now\n```\n<raw> text\n```"
        );
    }

    #[test]
    fn inbound_single_line_code_block() {
        assert_eq!(
            wiki_to_markdown("{code:title=Main.java|borderStyle=solid}int x;{code}"),
            "```\nint x;\n```"
        );
    }

    #[test]
    fn inbound_strips_html() {
        let wiki = "<p>Hello <strong>world</strong><br/>again</p> <span class=\"x\">done</span>";
        assert_eq!(wiki_to_markdown(wiki), "Hello worldagain done");
        assert_eq!(wiki_to_markdown("<<b>i>x"), "x");
    }

    #[test]
    fn inbound_smart_links() {
        assert_eq!(
            wiki_to_markdown("see [the docs|https://example.com/docs|smart-link]"),
            "see [the docs](https://example.com/docs)"
        );
        assert_eq!(
            wiki_to_markdown("[https://example.com|https://example.com]"),
            "https://example.com/"
        );
        assert_eq!(wiki_to_markdown("[a|not a url]"), "[a|not a url]");
    }

    #[test]
    fn inbound_mentions_anonymous_by_default() {
        assert_eq!(
            wiki_to_markdown("ping [~accountid:557058:f1a2b3c4-d5e6-7788-99aa-bbccddeeff00]"),
            "ping @user-ddeeff00"
        );
    }

    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl UserResolver for CountingResolver {
        fn display_name(&self, account_id: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (account_id == "known").then(|| "Ada Lovelace".to_string())
        }
    }

    #[test]
    fn mentions_resolve_through_cache() {
        let cache = UserCache::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let wiki = "[~accountid:known] and [~accountid:known] but not [~accountid:ghost-12345678]";
        let md = wiki_to_markdown_with(wiki, &cache);
        assert_eq!(md, "@Ada Lovelace and @Ada Lovelace but not @user-12345678");
        let _ = wiki_to_markdown_with(wiki, &cache);
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn inbound_is_idempotent() {
        let samples = [
            STORY_WIKI,
            "h2. Notes\n* a [~accountid:abc123456789]\n** b {{code}}\n[x|https://x.io/a?b=c]",
            "{code:rust}\nfn main() {}\n{code}\n<p>h1. fake</p>\n*bold*",
            "  {noformat}\nunterminated <T>\n",
            "<b>{{</b>x}}",
            "```\nalready markdown\n```\n# heading\n- list",
            "{code}\n```\nx\n{code}",
            "{noformat}\n````go\n{noformat}\nafter",
            "```\nunclosed fence",
            "",
            "   \n\t",
        ];
        for s in samples {
            let once = wiki_to_markdown(s);
            assert_eq!(wiki_to_markdown(&once), once, "input: {s:?}");
        }
    }
}
