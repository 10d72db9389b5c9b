//! A JIRA issue prepared for the terminal: wiki bodies converted to
//! Markdown, people reduced to display names.

use serde::Serialize;

use crate::jira::{Comment, Issue, JiraUser, Named};
use crate::markup::{wiki_to_markdown_with, UserResolver};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub author: String,
    pub created: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueView {
    pub key: String,
    pub url: String,
    pub summary: String,
    pub status: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub description: String,
    pub comments: Vec<CommentView>,
}

fn name(n: &Option<Named>) -> Option<String> {
    n.as_ref().map(|n| n.name.clone()).filter(|s| !s.is_empty())
}

fn person(u: &Option<JiraUser>) -> Option<String> {
    u.as_ref()
        .map(|u| u.display_name.clone())
        .filter(|s| !s.is_empty())
}

impl IssueView {
    pub fn build(
        issue: Issue,
        comments: Vec<Comment>,
        url: String,
        users: &dyn UserResolver,
    ) -> Self {
        let f = &issue.fields;
        let description = f
            .description
            .as_deref()
            .map(|d| wiki_to_markdown_with(d, users))
            .unwrap_or_default();
        Self {
            key: issue.key.clone(),
            url,
            summary: f.summary.clone(),
            status: name(&f.status),
            issue_type: name(&f.issuetype),
            priority: name(&f.priority),
            assignee: person(&f.assignee),
            reporter: person(&f.reporter),
            created: f.created.clone(),
            updated: f.updated.clone(),
            description,
            comments: comments
                .into_iter()
                .map(|c| CommentView {
                    author: person(&c.author).unwrap_or_else(|| "Unknown".into()),
                    created: c.created,
                    body: wiki_to_markdown_with(&c.body, users),
                })
                .collect(),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}: {}\n\n", self.key, self.summary);

        let fields = [
            ("Status", &self.status),
            ("Type", &self.issue_type),
            ("Priority", &self.priority),
            ("Assignee", &self.assignee),
            ("Reporter", &self.reporter),
            ("Created", &self.created),
            ("Updated", &self.updated),
        ];
        for (label, value) in fields {
            if let Some(v) = value {
                out.push_str(&format!("- **{label}**: {v}\n"));
            }
        }
        out.push_str(&format!("- **URL**: {}\n", self.url));

        out.push_str("\n## Description\n\n");
        if self.description.is_empty() {
            out.push_str("_No description._\n");
        } else {
            out.push_str(&self.description);
            out.push('\n');
        }

        if !self.comments.is_empty() {
            out.push_str(&format!("\n## Comments ({})\n", self.comments.len()));
            for c in &self.comments {
                match &c.created {
                    Some(when) => out.push_str(&format!("\n### {} ({when})\n\n", c.author)),
                    None => out.push_str(&format!("\n### {}\n\n", c.author)),
                }
                out.push_str(&c.body);
                out.push('\n');
            }
        }
        out
    }
}
