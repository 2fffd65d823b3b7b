//! Jira REST client for filing incident reports.
//!
//! Jira deployments differ in context path (`/jira` or not) and supported API
//! version, so every call walks the base/version candidates until one answers
//! with something other than 404. The working pair is tried first afterwards.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, multipart};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    render::adf::to_adf,
};

use super::{GenericTrackerClient, TrackerClient};

const API_VERSIONS: [&str; 3] = ["3", "2", "latest"];
const SUMMARY_MAX_CHARS: usize = 255;
const SNIPPET_MAX_CHARS: usize = 300;
const REQUEST_TIMEOUT_SECS: u64 = 30;

// Extra methods on `TrackerClient` applied by the jira implementation.

impl TrackerClient {
    /// Creates a Jira tracker client, failing when Jira is not configured.
    pub fn jira(config: &Config) -> Res<Self> {
        let client = JiraTrackerClient::new(config)?;
        Ok(Self::new(std::sync::Arc::new(client)))
    }
}

// Structs.

#[derive(Debug, Clone, PartialEq, Eq)]
enum JiraAuth {
    /// Personal access token (Server/DC).
    Bearer(String),
    /// E-mail + API token (Cloud), or username + password (Server/DC).
    Basic { username: String, password: String },
}

/// A base URL and API version that answered successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    base: String,
    version: &'static str,
}

/// Jira tracker implementation.
pub struct JiraTrackerClient {
    http: Client,
    base_url: String,
    project_key: String,
    issue_type: String,
    issue_type_id: Option<String>,
    auth: JiraAuth,
    selected: Mutex<Option<Endpoint>>,
}

impl JiraTrackerClient {
    /// Create a new Jira client from the configuration.
    #[instrument(name = "JiraTrackerClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let (Some(base_url), Some(project_key)) = (non_empty(&config.jira_url), non_empty(&config.jira_project_key)) else {
            return Err(anyhow::anyhow!(
                "Missing Jira configuration. Set JIRA_URL and JIRA_PROJECT_KEY, plus one of: (JIRA_EMAIL + JIRA_API_TOKEN), (JIRA_USERNAME + JIRA_PASSWORD), or JIRA_PAT."
            ));
        };

        let auth = select_auth(config).ok_or_else(|| {
            anyhow::anyhow!("No Jira credentials provided. Set (JIRA_EMAIL + JIRA_API_TOKEN) or (JIRA_USERNAME + JIRA_PASSWORD) or JIRA_PAT.")
        })?;

        // Redirects usually mean a login page; surface them instead of following.
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let issue_type = match config.jira_issue_type.trim() {
            "" => "Task".to_string(),
            name => name.to_string(),
        };

        info!("Jira client configured for project {} at {}", project_key, base_url);

        Ok(Self {
            http,
            base_url,
            project_key,
            issue_type,
            issue_type_id: non_empty(&config.jira_issue_type_id),
            auth,
            selected: Mutex::new(None),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");

        match &self.auth {
            JiraAuth::Bearer(token) => request.bearer_auth(token),
            JiraAuth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    /// The base/version pairs to try, the last working one first.
    fn endpoints(&self) -> Vec<Endpoint> {
        let selected = self.selected.lock().unwrap_or_else(PoisonError::into_inner).clone();
        candidate_endpoints(&self.base_url, selected.as_ref())
    }

    fn remember(&self, endpoint: Endpoint) {
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner) = Some(endpoint);
    }

    /// Send a request to `path` on each candidate endpoint until one answers with something other than 404.
    ///
    /// `build` creates a fresh request for a full URL.
    async fn send<F>(&self, action: &str, path: &str, build: F) -> Res<Response>
    where
        F: Fn(&str) -> Res<RequestBuilder>,
    {
        let mut attempts = Vec::new();
        let mut last_snippet = String::new();

        for endpoint in self.endpoints() {
            let url = format!("{}/rest/api/{}{}", endpoint.base, endpoint.version, path);
            let response = self.authorize(build(&url)?).send().await?;
            let status = response.status();

            if status.is_redirection() {
                let location = response.headers().get("Location").and_then(|l| l.to_str().ok()).unwrap_or_default().to_string();
                return Err(anyhow::anyhow!(
                    "Jira {action} received redirect ({status}) to {location}. This usually indicates authentication failure. Verify credentials for {url}."
                ));
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                debug!("Jira {} got 404 from {}", action, url);
                last_snippet = snippet(&response.text().await.unwrap_or_default());
                attempts.push(format!("{url} -> 404"));
                continue;
            }

            if status.is_client_error() || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow::anyhow!("Jira {action} failed: {} {}", status.as_u16(), snippet(&body)));
            }

            self.remember(endpoint);

            return Ok(response);
        }

        Err(anyhow::anyhow!(
            "Jira {action} failed with 404 on all versions ({}). Last response snippet: {last_snippet}",
            attempts.join("; ")
        ))
    }
}

#[async_trait]
impl GenericTrackerClient for JiraTrackerClient {
    #[instrument(skip(self, description_markdown, extra_fields))]
    async fn create_issue(&self, summary: &str, description_markdown: &str, extra_fields: Map<String, Value>) -> Res<String> {
        let payload = build_create_payload(&self.project_key, &self.issue_type, self.issue_type_id.as_deref(), summary, description_markdown, extra_fields);

        let response = self.send("create issue", "/issue", |url| Ok(self.http.post(url).json(&payload))).await?;
        let created: Value = response.json().await?;

        let key = issue_key(&created);

        info!("Created Jira issue {}", key);

        Ok(key)
    }

    #[instrument(skip(self, fields))]
    async fn update_issue(&self, key: &str, fields: Map<String, Value>) -> Void {
        if fields.is_empty() {
            debug!("No fields supplied for {}, skipping update.", key);
            return Ok(());
        }

        let payload = json!({ "fields": fields });

        self.send("update", &format!("/issue/{key}"), |url| Ok(self.http.put(url).json(&payload))).await?;

        info!("Updated Jira issue {}", key);

        Ok(())
    }

    #[instrument(skip(self, content))]
    async fn attach_markdown(&self, key: &str, filename: &str, content: &str) -> Void {
        self.send("attach", &format!("/issue/{key}/attachments"), |url| {
            let part = multipart::Part::bytes(content.as_bytes().to_vec()).file_name(filename.to_string()).mime_str("text/markdown")?;
            let form = multipart::Form::new().part("file", part);

            Ok(self.http.post(url).header("X-Atlassian-Token", "no-check").multipart(form))
        })
        .await?;

        info!("Attached {} to Jira issue {}", filename, key);

        Ok(())
    }
}

// Helpers.

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Pick credentials: PAT, then e-mail + API token, then username + password.
fn select_auth(config: &Config) -> Option<JiraAuth> {
    if let Some(pat) = non_empty(&config.jira_pat) {
        return Some(JiraAuth::Bearer(pat));
    }

    if let (Some(username), Some(password)) = (non_empty(&config.jira_email), non_empty(&config.jira_api_token)) {
        return Some(JiraAuth::Basic { username, password });
    }

    if let (Some(username), Some(password)) = (non_empty(&config.jira_username), non_empty(&config.jira_password)) {
        return Some(JiraAuth::Basic { username, password });
    }

    None
}

/// The configured base without and with a `/jira` context path, deduplicated.
fn candidate_bases(base_url: &str) -> Vec<String> {
    let base = base_url.trim().trim_end_matches('/');

    let without = match base.len().checked_sub("/jira".len()).and_then(|at| base.get(at..).map(|tail| (at, tail))) {
        Some((at, tail)) if tail.eq_ignore_ascii_case("/jira") => &base[..at],
        _ => base,
    };
    let without = if without.is_empty() { "/" } else { without };
    let with = format!("{}/jira", without.trim_end_matches('/'));

    let mut bases = vec![without.to_string()];
    if !bases.contains(&with) {
        bases.push(with);
    }

    bases
}

/// Every base/version pair, with the last working pair's base and version first.
fn candidate_endpoints(base_url: &str, selected: Option<&Endpoint>) -> Vec<Endpoint> {
    let mut bases = candidate_bases(base_url);
    let mut versions = API_VERSIONS.to_vec();

    if let Some(selected) = selected {
        bases.retain(|b| b != &selected.base);
        bases.insert(0, selected.base.clone());
        versions.retain(|v| v != &selected.version);
        versions.insert(0, selected.version);
    }

    bases
        .iter()
        .flat_map(|base| {
            versions.iter().map(move |version| Endpoint {
                base: base.trim_end_matches('/').to_string(),
                version: *version,
            })
        })
        .collect()
}

fn build_create_payload(project_key: &str, issue_type: &str, issue_type_id: Option<&str>, summary: &str, description_markdown: &str, extra_fields: Map<String, Value>) -> Value {
    let mut fields = Map::new();

    fields.insert("project".to_string(), json!({ "key": project_key }));
    fields.insert("description".to_string(), to_adf(description_markdown));
    fields.insert(
        "issuetype".to_string(),
        match issue_type_id {
            Some(id) => json!({ "id": id }),
            None => json!({ "name": issue_type }),
        },
    );

    let summary = summary.trim();
    if !summary.is_empty() {
        fields.insert("summary".to_string(), Value::String(summary.chars().take(SUMMARY_MAX_CHARS).collect()));
    }

    fields.extend(extra_fields);

    json!({ "fields": fields })
}

/// The created issue's key, else its id.
fn issue_key(created: &Value) -> String {
    ["key", "id"]
        .iter()
        .find_map(|field| match &created[*field] {
            Value::String(value) if !value.is_empty() => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "(unknown)".to_string())
}

fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_MAX_CHARS).collect()
}
