//! Google Docs export through a deployed Apps Script web app.
//!
//! The web app receives `{title, html, token, folderId?}` and answers with
//! `{id, link}`, or `{error}` when it refuses the request.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::{
    base::{config::Config, types::Res},
    render::html::to_html,
};

use super::{DocsClient, GenericDocsClient};

const REQUEST_TIMEOUT_SECS: u64 = 30;

// Extra methods on `DocsClient` applied by the Apps Script implementation.

impl DocsClient {
    /// Creates an Apps Script docs client.
    ///
    /// The export is disabled when no web app URL is configured, and an error
    /// when the URL is set without a shared secret.
    pub fn apps_script(config: &Config) -> Res<Self> {
        let Some(webapp_url) = non_empty(&config.google_webapp_url) else {
            info!("No Google web app configured; the Docs export is disabled.");
            return Ok(Self::disabled());
        };

        let client = AppsScriptDocsClient::new(webapp_url, config)?;
        Ok(Self::new(Arc::new(client)))
    }
}

// Structs.

/// Apps Script docs implementation.
pub struct AppsScriptDocsClient {
    http: Client,
    webapp_url: String,
    shared_secret: String,
    folder_id: Option<String>,
}

impl AppsScriptDocsClient {
    #[instrument(name = "AppsScriptDocsClient::new", skip_all)]
    fn new(webapp_url: String, config: &Config) -> Res<Self> {
        let shared_secret = non_empty(&config.google_shared_secret).ok_or_else(|| anyhow::anyhow!("Missing GOOGLE_SHARED_SECRET for the Google Apps Script endpoint."))?;

        let http = Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS)).build()?;

        Ok(Self {
            http,
            webapp_url,
            shared_secret,
            folder_id: non_empty(&config.google_folder_id),
        })
    }
}

#[async_trait]
impl GenericDocsClient for AppsScriptDocsClient {
    #[instrument(skip(self, markdown))]
    async fn create_document(&self, title: &str, markdown: &str) -> Res<Option<String>> {
        let payload = build_payload(title, &to_html(markdown), &self.shared_secret, self.folder_id.as_deref());

        let response = self.http.post(&self.webapp_url).json(&payload).send().await?.error_for_status()?;

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|t| t.to_str().ok())
            .is_some_and(|t| t.starts_with("application/json"));

        let body: Value = if is_json { response.json().await? } else { json!({}) };
        let link = read_link(&body)?;

        match &link {
            Some(link) => info!("Created Google Doc {}", link),
            None => debug!("Google web app returned no document link."),
        }

        Ok(link)
    }
}

// Helpers.

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn build_payload(title: &str, html: &str, token: &str, folder_id: Option<&str>) -> Value {
    let mut payload = json!({ "title": title, "html": html, "token": token });

    if let Some(folder_id) = folder_id {
        payload["folderId"] = Value::String(folder_id.to_string());
    }

    payload
}

/// The document link of a web app response, or its `error` as an error.
fn read_link(body: &Value) -> Res<Option<String>> {
    let Some(body) = body.as_object() else {
        return Err(anyhow::anyhow!("Unexpected response from Google Apps Script."));
    };

    if let Some(error) = body.get("error") {
        let error = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return Err(anyhow::anyhow!("{}", error));
    }

    Ok(body.get("link").and_then(Value::as_str).filter(|l| !l.is_empty()).map(str::to_string))
}
