#![doc = "Content generator backed by an OpenAI-compatible chat completions endpoint."]
//!
//! [`ChatGenerator`] implements [`ContentGenerator`] for the CLI. It sends one request per
//! call, never retries, and treats an empty reply as unusable output.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use repo_scribe_core::contract::ContentGenerator;
use repo_scribe_core::error::AnalysisError;
use repo_scribe_core::state::FileTask;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";

const ANALYZE_SYSTEM_PROMPT: &str = "You are a technical documentation expert specializing in code analysis. \
Document the provided file: a high-level overview, each function/class/component, parameters and \
return values, dependencies, and notable implementation details. Answer in Markdown.";

const OVERVIEW_SYSTEM_PROMPT: &str = "You are a software architect. Given the list of source files in a \
repository, describe its structure, key components and architecture in Markdown.";

const README_SYSTEM_PROMPT: &str = "You write README files. Given a repository name and its source \
files, draft a README in Markdown with an overview, key features and project structure.";

/// Connection settings for [`ChatGenerator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

impl GeneratorConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's text out of a completions response body.
fn reply_text(body: &str, label: &str) -> Result<String, AnalysisError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::Service(format!("could not decode completion: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AnalysisError::EmptyOutput {
            label: label.to_string(),
        })
}

fn file_listing(tasks: &[FileTask]) -> String {
    tasks
        .iter()
        .map(|task| format!("- {} ({})\n", task.path, task.name))
        .collect()
}

pub struct ChatGenerator {
    client: Client,
    config: GeneratorConfig,
}

impl ChatGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        tracing::info!(
            api_base_url = %config.api_base_url,
            model = %config.model,
            api_key_set = !config.api_key.is_empty(),
            "Initialized chat generator"
        );
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        label: &str,
    ) -> Result<String, AnalysisError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };
        tracing::debug!(label, model = %self.config.model, "Requesting completion");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, label, "Completion request failed");
                AnalysisError::Service(e.to_string())
            })?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AnalysisError::Service(e.to_string()))?;
        if !status.is_success() {
            tracing::error!(
                status = %status,
                label,
                "Completion endpoint returned error. Response body: {body}"
            );
            return Err(AnalysisError::Service(format!("HTTP {status}")));
        }
        reply_text(&body, label)
    }
}

#[async_trait]
impl ContentGenerator for ChatGenerator {
    async fn analyze_file(&self, content: &str, filename: &str) -> Result<String, AnalysisError> {
        let user = format!(
            "File: {filename}\n\nCode:\n```\n{content}\n```\n\nPlease generate comprehensive technical documentation for this file."
        );
        self.complete(ANALYZE_SYSTEM_PROMPT, &user, filename).await
    }

    async fn synthesize_repository_overview(
        &self,
        tasks: &[FileTask],
    ) -> Result<String, AnalysisError> {
        let user = format!("Source files:\n{}", file_listing(tasks));
        self.complete(OVERVIEW_SYSTEM_PROMPT, &user, "repository overview")
            .await
    }

    async fn synthesize_readme(
        &self,
        repo_name: &str,
        tasks: &[FileTask],
    ) -> Result<String, AnalysisError> {
        let user = format!(
            "Repository: {repo_name}\n\nSource files:\n{}",
            file_listing(tasks)
        );
        self.complete(README_SYSTEM_PROMPT, &user, "README").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_takes_first_choice() {
        let body = r##"{"choices":[{"message":{"role":"assistant","content":"# Doc"}},
                                   {"message":{"role":"assistant","content":"ignored"}}]}"##;
        assert_eq!(reply_text(body, "a.py").unwrap(), "# Doc");
    }

    #[test]
    fn reply_text_rejects_empty_output() {
        let blank = r#"{"choices":[{"message":{"content":"   \n"}}]}"#;
        assert_eq!(
            reply_text(blank, "a.py"),
            Err(AnalysisError::EmptyOutput {
                label: "a.py".into()
            })
        );
        let none = r#"{"choices":[]}"#;
        assert!(matches!(
            reply_text(none, "a.py"),
            Err(AnalysisError::EmptyOutput { .. })
        ));
    }

    #[test]
    fn reply_text_reports_undecodable_bodies() {
        assert!(matches!(
            reply_text("<html>", "a.py"),
            Err(AnalysisError::Service(_))
        ));
    }

    #[test]
    fn request_serializes_in_chat_shape() {
        let request = ChatRequest {
            model: "gpt-4",
            temperature: 0.0,
            messages: [
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "u");
    }

    #[test]
    fn file_listing_keeps_task_order() {
        let tasks = vec![
            FileTask::new("b.py", "src/b.py", None),
            FileTask::new("a.py", "a.py", None),
        ];
        assert_eq!(file_listing(&tasks), "- src/b.py (b.py)\n- a.py (a.py)\n");
    }
}
