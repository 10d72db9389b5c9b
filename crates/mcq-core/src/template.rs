//! A small plain-text, mustache-style template engine.
//!
//! Supported tags:
//!
//! | Tag | Meaning |
//! |---|---|
//! | `{{name}}` | interpolate a variable |
//! | `{{helper name}}` | call a registered helper with one variable |
//! | `{{#if name}}…{{else}}…{{/if}}` | conditional on truthiness |
//! | `{{#each name}}…{{/each}}` | iterate a list (`{{this}}`) or map (`{{key}}`, `{{value}}`) |
//! | `{{! text }}` | comment |
//!
//! Output is never escaped. A block tag alone on its line removes that line
//! from the output. Unknown variables and helpers are render errors.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::context::RepoContext;
use crate::format::format_context;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Repo(Box<RepoContext>),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Text(s) => !s.trim().is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Repo(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Map(map) => {
                for (k, v) in map {
                    writeln!(f, "{k}: {v}")?;
                }
                Ok(())
            }
            Value::Repo(ctx) => f.write_str(&format_context(ctx)),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map(Value::Text).unwrap_or(Value::Null)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::Text).collect())
    }
}

impl From<BTreeMap<String, String>> for Value {
    fn from(map: BTreeMap<String, String>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, Value::Text(v))).collect())
    }
}

pub type Vars = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub type HelperFn = fn(&Value) -> Result<String, String>;

/// Named functions callable as `{{name arg}}`.
#[derive(Clone)]
pub struct Helpers {
    fns: HashMap<&'static str, HelperFn>,
}

impl Default for Helpers {
    fn default() -> Self {
        let mut helpers = Self {
            fns: HashMap::new(),
        };
        helpers.register("format_context", format_context_helper);
        helpers
    }
}

impl Helpers {
    pub fn register(&mut self, name: &'static str, f: HelperFn) {
        self.fns.insert(name, f);
    }

    fn get(&self, name: &str) -> Option<HelperFn> {
        self.fns.get(name).copied()
    }
}

fn format_context_helper(value: &Value) -> Result<String, String> {
    match value {
        Value::Repo(ctx) => Ok(format_context(ctx)),
        Value::Null => Ok(String::new()),
        other => Err(format!(
            "format_context expects repository context, got {}",
            kind_name(other)
        )),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Text(_) => "text",
        Value::List(_) => "a list",
        Value::Map(_) => "a map",
        Value::Repo(_) => "repository context",
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for TemplateError {}

fn err(line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError {
        line,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var {
        name: String,
        line: usize,
    },
    Helper {
        name: String,
        arg: String,
        line: usize,
    },
    If {
        cond: String,
        line: usize,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Each {
        list: String,
        line: usize,
        body: Vec<Node>,
    },
}

#[derive(Debug)]
enum Token {
    Text(String),
    Tag { body: String, line: usize },
}

impl Token {
    fn is_standalone_kind(&self) -> bool {
        match self {
            Token::Tag { body, .. } => {
                body.starts_with('#') || body.starts_with('/') || body.starts_with('!') || body == "else"
            }
            Token::Text(_) => false,
        }
    }
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let mut tokens = tokenize(src)?;
        strip_standalone_lines(&mut tokens);
        let nodes = build(tokens)?;
        Ok(Self { nodes })
    }

    pub fn render(&self, vars: &Vars, helpers: &Helpers) -> Result<String, TemplateError> {
        let mut out = String::new();
        let mut scope = Scope {
            base: vars,
            frames: Vec::new(),
        };
        render_nodes(&self.nodes, &mut scope, helpers, &mut out)?;
        Ok(out)
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = src;
    let mut line = 1;

    while let Some(start) = rest.find("{{") {
        let (text, after) = rest.split_at(start);
        if !text.is_empty() {
            tokens.push(Token::Text(text.to_string()));
        }
        line += text.matches('\n').count();

        let after = &after[2..];
        let end = after
            .find("}}")
            .ok_or_else(|| err(line, "unclosed '{{' tag"))?;
        let body = after[..end].trim().to_string();
        if body.is_empty() {
            return Err(err(line, "empty tag"));
        }
        tokens.push(Token::Tag { body, line });
        line += after[..end].matches('\n').count();
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    Ok(tokens)
}

/// Remove the line a block tag sits on when nothing else shares it.
fn strip_standalone_lines(tokens: &mut [Token]) {
    let mut stripped = vec![false; tokens.len()];
    for i in 0..tokens.len() {
        if !tokens[i].is_standalone_kind() {
            continue;
        }

        let before_ok = match i.checked_sub(1).map(|j| &tokens[j]) {
            None => true,
            Some(Token::Text(t)) => {
                let tail = t.rsplit('\n').next().unwrap_or_default();
                let at_line_start = t.contains('\n') || i == 1 || (i >= 2 && stripped[i - 2]);
                at_line_start && tail.chars().all(|c| c == ' ' || c == '\t')
            }
            Some(Token::Tag { .. }) => false,
        };
        let after_ok = match tokens.get(i + 1) {
            None => true,
            Some(Token::Text(t)) => {
                let head = t.split('\n').next().unwrap_or_default();
                head.chars().all(|c| c == ' ' || c == '\t' || c == '\r')
            }
            Some(Token::Tag { .. }) => false,
        };
        if !(before_ok && after_ok) {
            continue;
        }

        if let Some(Token::Text(t)) = i.checked_sub(1).and_then(|j| tokens.get_mut(j)) {
            let keep = t.rfind('\n').map(|p| p + 1).unwrap_or(0);
            t.truncate(keep);
        }
        if let Some(Token::Text(t)) = tokens.get_mut(i + 1) {
            *t = match t.find('\n') {
                Some(p) => t[p + 1..].to_string(),
                None => String::new(),
            };
        }
        stripped[i] = true;
    }
}

enum BlockKind {
    If { cond: String },
    Each { list: String },
}

struct Open {
    kind: BlockKind,
    line: usize,
    body: Vec<Node>,
    otherwise: Option<Vec<Node>>,
}

impl Open {
    fn target(&mut self) -> &mut Vec<Node> {
        match self.otherwise.as_mut() {
            Some(other) => other,
            None => &mut self.body,
        }
    }
}

fn build(tokens: Vec<Token>) -> Result<Vec<Node>, TemplateError> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    fn push(root: &mut Vec<Node>, stack: &mut [Open], node: Node) {
        match stack.last_mut() {
            Some(open) => open.target().push(node),
            None => root.push(node),
        }
    }

    for token in tokens {
        let (body, line) = match token {
            Token::Text(t) => {
                if !t.is_empty() {
                    push(&mut root, &mut stack, Node::Text(t));
                }
                continue;
            }
            Token::Tag { body, line } => (body, line),
        };

        if body.starts_with('!') {
            continue;
        }

        if let Some(open_tag) = body.strip_prefix('#') {
            let mut parts = open_tag.split_whitespace();
            let keyword = parts.next().unwrap_or_default();
            let arg = parts
                .next()
                .ok_or_else(|| err(line, format!("'#{keyword}' needs an argument")))?;
            if parts.next().is_some() {
                return Err(err(line, format!("'#{keyword}' takes exactly one argument")));
            }
            let kind = match keyword {
                "if" => BlockKind::If { cond: arg.into() },
                "each" => BlockKind::Each { list: arg.into() },
                other => return Err(err(line, format!("unknown block '#{other}'"))),
            };
            stack.push(Open {
                kind,
                line,
                body: Vec::new(),
                otherwise: None,
            });
            continue;
        }

        if body == "else" {
            match stack.last_mut() {
                Some(open) if matches!(open.kind, BlockKind::If { .. }) && open.otherwise.is_none() => {
                    open.otherwise = Some(Vec::new());
                }
                _ => return Err(err(line, "'else' outside of an '#if' block")),
            }
            continue;
        }

        if let Some(close) = body.strip_prefix('/') {
            let open = stack
                .pop()
                .ok_or_else(|| err(line, format!("unexpected '/{close}'")))?;
            let node = match (open.kind, close.trim()) {
                (BlockKind::If { cond }, "if") => Node::If {
                    cond,
                    line: open.line,
                    then: open.body,
                    otherwise: open.otherwise.unwrap_or_default(),
                },
                (BlockKind::Each { list }, "each") => Node::Each {
                    list,
                    line: open.line,
                    body: open.body,
                },
                (_, other) => {
                    return Err(err(
                        line,
                        format!("'/{other}' does not close the block opened on line {}", open.line),
                    ))
                }
            };
            push(&mut root, &mut stack, node);
            continue;
        }

        let words: Vec<&str> = body.split_whitespace().collect();
        let node = match words.as_slice() {
            [name] => Node::Var {
                name: (*name).to_string(),
                line,
            },
            [helper, arg] => Node::Helper {
                name: (*helper).to_string(),
                arg: (*arg).to_string(),
                line,
            },
            _ => return Err(err(line, format!("cannot parse tag '{{{{{body}}}}}'"))),
        };
        push(&mut root, &mut stack, node);
    }

    if let Some(open) = stack.last() {
        let name = match open.kind {
            BlockKind::If { .. } => "#if",
            BlockKind::Each { .. } => "#each",
        };
        return Err(err(open.line, format!("'{name}' is never closed")));
    }
    Ok(root)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

struct Scope<'a> {
    base: &'a Vars,
    frames: Vec<Vars>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str, line: usize) -> Result<Value, TemplateError> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.get(name) {
                return Ok(v.clone());
            }
        }
        self.base
            .get(name)
            .cloned()
            .ok_or_else(|| err(line, format!("unknown variable '{name}'")))
    }
}

fn render_nodes(
    nodes: &[Node],
    scope: &mut Scope<'_>,
    helpers: &Helpers,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Var { name, line } => {
                let value = scope.lookup(name, *line)?;
                out.push_str(&value.to_string());
            }
            Node::Helper { name, arg, line } => {
                let f = helpers
                    .get(name)
                    .ok_or_else(|| err(*line, format!("unknown helper '{name}'")))?;
                let value = scope.lookup(arg, *line)?;
                out.push_str(&f(&value).map_err(|m| err(*line, m))?);
            }
            Node::If {
                cond,
                line,
                then,
                otherwise,
            } => {
                let branch = if scope.lookup(cond, *line)?.truthy() {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, scope, helpers, out)?;
            }
            Node::Each { list, line, body } => {
                let frames: Vec<Vars> = match scope.lookup(list, *line)? {
                    Value::Null => Vec::new(),
                    Value::List(items) => items
                        .into_iter()
                        .map(|item| Vars::from([("this".to_string(), item)]))
                        .collect(),
                    Value::Map(map) => map
                        .into_iter()
                        .map(|(k, v)| {
                            Vars::from([
                                ("key".to_string(), Value::Text(k)),
                                ("this".to_string(), v.clone()),
                                ("value".to_string(), v),
                            ])
                        })
                        .collect(),
                    other => {
                        return Err(err(
                            *line,
                            format!("'#each {list}' needs a list or map, got {}", kind_name(&other)),
                        ))
                    }
                };
                for frame in frames {
                    scope.frames.push(frame);
                    let result = render_nodes(body, scope, helpers, out);
                    scope.frames.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}

/// Parse and render in one step.
pub fn render_str(src: &str, vars: &Vars, helpers: &Helpers) -> Result<String, TemplateError> {
    Template::parse(src)?.render(vars, helpers)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
