//! Minimal JIRA REST v2 client: create a story, read an issue and its
//! comments, and resolve account ids to display names.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::JiraCredentials;
use crate::error::{McqError, Result};
use crate::markup::UserResolver;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self", default)]
    pub self_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: Option<Named>,
    #[serde(default)]
    pub issuetype: Option<Named>,
    #[serde(default)]
    pub priority: Option<Named>,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    #[serde(default)]
    pub reporter: Option<JiraUser>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: Option<JiraUser>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentPage {
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// JiraClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct JiraClient {
    http: Client,
    creds: JiraCredentials,
}

impl JiraClient {
    pub fn new(creds: JiraCredentials, timeout: Duration) -> Result<Self> {
        reqwest::Url::parse(&creds.instance_url).map_err(|e| McqError::InvalidUrl {
            url: creds.instance_url.clone(),
            message: e.to_string(),
        })?;
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mcq/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, creds })
    }

    pub fn project_key(&self) -> &str {
        &self.creds.project_key
    }

    /// Human-facing URL of an issue.
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.creds.instance_url)
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/2/{path}", self.creds.instance_url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.creds.username, Some(&self.creds.api_token))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// File a Story in the configured project. `description` is wiki markup.
    pub fn create_issue(&self, summary: &str, description: &str) -> Result<CreatedIssue> {
        let payload = json!({
            "fields": {
                "project": { "key": self.creds.project_key },
                "issuetype": { "name": "Story" },
                "summary": summary,
                "description": description,
            }
        });
        tracing::debug!(project = %self.creds.project_key, summary, "creating JIRA issue");
        let resp = self.authed(self.http.post(self.api("issue"))).json(&payload).send()?;
        let created: CreatedIssue = check(resp)?.json()?;
        tracing::info!(key = %created.key, "created JIRA issue");
        Ok(created)
    }

    pub fn get_issue(&self, key: &str) -> Result<Issue> {
        let resp = self.authed(self.http.get(self.api(&format!("issue/{key}")))).send()?;
        Ok(check(resp)?.json()?)
    }

    pub fn get_comments(&self, key: &str) -> Result<Vec<Comment>> {
        let resp = self
            .authed(self.http.get(self.api(&format!("issue/{key}/comment"))))
            .send()?;
        let page: CommentPage = check(resp)?.json()?;
        Ok(page.comments)
    }

    pub fn get_user(&self, account_id: &str) -> Result<JiraUser> {
        let resp = self
            .authed(self.http.get(self.api("user")))
            .query(&[("accountId", account_id)])
            .send()?;
        Ok(check(resp)?.json()?)
    }

    /// The authenticated user; used to check credentials.
    pub fn myself(&self) -> Result<JiraUser> {
        let resp = self.authed(self.http.get(self.api("myself"))).send()?;
        Ok(check(resp)?.json()?)
    }
}

impl UserResolver for JiraClient {
    fn display_name(&self, account_id: &str) -> Option<String> {
        match self.get_user(account_id) {
            Ok(user) if !user.display_name.is_empty() => Some(user.display_name),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(account_id, error = %e, "user lookup failed");
                None
            }
        }
    }
}

fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(McqError::Jira {
        status: status.as_u16(),
        message: error_message(&body, status.canonical_reason().unwrap_or("request failed")),
    })
}

/// Flatten JIRA's `errorMessages`/`errors` body into one line.
fn error_message(body: &str, fallback: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let mut parts = parsed.error_messages;
    parts.extend(parsed.errors.into_iter().map(|(k, v)| format!("{k}: {v}")));
    if parts.is_empty() {
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.starts_with('<') {
            return fallback.to_string();
        }
        return crate::format::excerpt(trimmed, 200);
    }
    parts.join("; ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
