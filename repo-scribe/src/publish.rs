#![doc = "Publishing target backed by the Confluence REST API: create-or-update pages keyed by title."]
//
//! # Confluence publishing
//!
//! [`ConfluencePublisher`] implements [`PublishingTarget`] for the CLI.
//!
//! - Looks up a page by exact title inside the space (`GET /rest/api/content`).
//! - Found: replaces the body and sends `version.number + 1` (`PUT /rest/api/content/{id}`).
//! - Not found: creates the page under the configured parent (`POST /rest/api/content`).
//!
//! Page bodies are Markdown. They are wrapped in Confluence's `markdown` macro so the text
//! renders as written instead of being parsed as storage-format XHTML.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use repo_scribe_core::contract::{PageReceipt, PageUpsert, PublishingTarget, UpsertAction};
use repo_scribe_core::error::PublishError;

/// Connection settings for [`ConfluencePublisher`].
#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    pub base_url: String,
    pub user: String,
    pub api_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<PageSummary>,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    id: String,
    version: PageVersion,
}

#[derive(Debug, Deserialize)]
struct PageVersion {
    number: u64,
}

/// Wrap Markdown in a storage-format `markdown` macro. `]]>` cannot appear inside CDATA,
/// so it is split across two sections.
pub fn storage_body(markdown: &str) -> String {
    let escaped = markdown.replace("]]>", "]]]]><![CDATA[>");
    format!(
        "<ac:structured-macro ac:name=\"markdown\"><ac:plain-text-body><![CDATA[{escaped}]]></ac:plain-text-body></ac:structured-macro>"
    )
}

fn create_payload(req: &PageUpsert) -> Value {
    json!({
        "type": "page",
        "title": req.title,
        "space": { "key": req.space_key },
        "ancestors": [{ "id": req.parent_id }],
        "body": {
            "storage": { "value": storage_body(&req.body), "representation": "storage" }
        }
    })
}

fn update_payload(req: &PageUpsert, page_id: &str, next_version: u64) -> Value {
    json!({
        "id": page_id,
        "type": "page",
        "title": req.title,
        "space": { "key": req.space_key },
        "body": {
            "storage": { "value": storage_body(&req.body), "representation": "storage" }
        },
        "version": { "number": next_version }
    })
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, PublishError> {
    serde_json::from_str(body).map_err(|e| PublishError::Decode(e.to_string()))
}

pub struct ConfluencePublisher {
    client: Client,
    config: ConfluenceConfig,
}

impl ConfluencePublisher {
    pub fn new(config: ConfluenceConfig) -> Self {
        tracing::info!(
            base_url = %config.base_url,
            user = %config.user,
            api_token_set = !config.api_token.is_empty(),
            "Initialized Confluence publisher"
        );
        Self {
            client: Client::new(),
            config,
        }
    }

    fn content_url(&self) -> String {
        format!(
            "{}/rest/api/content",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        title: &str,
    ) -> Result<String, PublishError> {
        let resp = builder
            .basic_auth(&self.config.user, Some(&self.config.api_token))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, title, "Confluence request failed");
                PublishError::Transport(e.to_string())
            })?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PublishError::Decode(e.to_string()))?;
        if !status.is_success() {
            tracing::error!(
                status = %status,
                title,
                "Confluence API returned error. Response body: {text}"
            );
            return Err(PublishError::Http {
                status: status.as_u16(),
                title: title.to_string(),
            });
        }
        Ok(text)
    }

    async fn find_page(
        &self,
        space_key: &str,
        title: &str,
    ) -> Result<Option<PageSummary>, PublishError> {
        let builder = self.client.get(self.content_url()).query(&[
            ("spaceKey", space_key),
            ("title", title),
            ("expand", "version"),
        ]);
        let body = self.send(builder, title).await?;
        let found: SearchResponse = decode(&body)?;
        Ok(found.results.into_iter().next())
    }
}

#[async_trait]
impl PublishingTarget for ConfluencePublisher {
    async fn upsert(&self, req: &PageUpsert) -> Result<PageReceipt, PublishError> {
        match self.find_page(&req.space_key, &req.title).await? {
            Some(existing) => {
                let next_version = existing.version.number + 1;
                tracing::info!(
                    title = %req.title,
                    page_id = %existing.id,
                    next_version,
                    "Updating existing Confluence page"
                );
                let url = format!("{}/{}", self.content_url(), existing.id);
                let builder = self
                    .client
                    .put(url)
                    .json(&update_payload(req, &existing.id, next_version));
                let body = self.send(builder, &req.title).await?;
                let updated: PageSummary = decode(&body)?;
                Ok(PageReceipt {
                    page_id: updated.id,
                    title: req.title.clone(),
                    version: updated.version.number,
                    action: UpsertAction::Updated,
                })
            }
            None => {
                tracing::info!(
                    title = %req.title,
                    parent_id = %req.parent_id,
                    "Creating Confluence page"
                );
                let builder = self
                    .client
                    .post(self.content_url())
                    .json(&create_payload(req));
                let body = self.send(builder, &req.title).await?;
                let created: PageSummary = decode(&body)?;
                Ok(PageReceipt {
                    page_id: created.id,
                    title: req.title.clone(),
                    version: created.version.number,
                    action: UpsertAction::Created,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PageUpsert {
        PageUpsert {
            space_key: "DEV".into(),
            title: "Documentation: main.py".into(),
            body: "# main.py".into(),
            parent_id: "4242".into(),
        }
    }

    #[test]
    fn storage_body_wraps_markdown_in_cdata() {
        assert_eq!(
            storage_body("# Title"),
            "<ac:structured-macro ac:name=\"markdown\"><ac:plain-text-body><![CDATA[# Title]]></ac:plain-text-body></ac:structured-macro>"
        );
    }

    #[test]
    fn storage_body_splits_cdata_terminators() {
        let body = storage_body("a ]]> b");
        assert!(body.contains("a ]]]]><![CDATA[> b"));
        assert_eq!(body.matches("<![CDATA[").count(), 2);
    }

    #[test]
    fn create_payload_targets_parent_page() {
        let payload = create_payload(&request());
        assert_eq!(payload["title"], "Documentation: main.py");
        assert_eq!(payload["space"]["key"], "DEV");
        assert_eq!(payload["ancestors"][0]["id"], "4242");
        assert_eq!(payload["body"]["storage"]["representation"], "storage");
    }

    #[test]
    fn update_payload_carries_next_version() {
        let payload = update_payload(&request(), "99", 4);
        assert_eq!(payload["id"], "99");
        assert_eq!(payload["version"]["number"], 4);
        assert!(payload.get("ancestors").is_none());
    }

    #[test]
    fn search_response_yields_first_match() {
        let found: SearchResponse = decode(
            r#"{"results":[{"id":"77","title":"Documentation: main.py","version":{"number":3}}],"size":1}"#,
        )
        .unwrap();
        let page = found.results.into_iter().next().unwrap();
        assert_eq!(page.id, "77");
        assert_eq!(page.version.number, 3);

        let empty: SearchResponse = decode(r#"{"results":[],"size":0}"#).unwrap();
        assert!(empty.results.is_empty());
    }
}
