//! Server-side conversation threads (OpenAI Assistants v2 style)

use crate::config::{LLMServiceConfig, ThreadConfig};
use crate::error::{MynaError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Status of an asynchronous run on a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    /// Terminal failure, with the server's reason
    Failed(String),
}

impl RunStatus {
    /// Map a wire status; anything terminal that is not `completed` is a failure
    pub fn from_wire(status: &str, detail: Option<&str>) -> Self {
        match status {
            "queued" => Self::Queued,
            "in_progress" | "cancelling" => Self::InProgress,
            "completed" => Self::Completed,
            other => Self::Failed(match detail {
                Some(detail) => format!("{}: {}", other, detail),
                None => other.to_string(),
            }),
        }
    }
}

/// Stateful multi-turn text generation
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// Open a thread whose every later run sees `instructions`
    async fn create_thread(&self, instructions: &str) -> Result<String>;

    /// Append a user message
    async fn send(&self, thread_id: &str, message: &str) -> Result<()>;

    /// Start generating a reply, returning the run id
    async fn start_run(&self, thread_id: &str) -> Result<String>;

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunStatus>;

    /// Ask the server to stop a run
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()>;

    /// Text of the newest message on the thread
    async fn latest_message(&self, thread_id: &str) -> Result<String>;

    /// Release the thread and its server-side resources
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}

/// Assistants v2 REST client
pub struct HttpThreadClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    assistant_id: String,
}

impl HttpThreadClient {
    pub fn new(llm: &LLMServiceConfig, threads: &ThreadConfig) -> Result<Self> {
        let assistant_id = threads
            .assistant_id
            .clone()
            .ok_or_else(|| MynaError::Config("thread client needs an assistant_id".into()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: llm.url.trim_end_matches('/').to_string(),
            api_key: llm.api_key.clone(),
            assistant_id,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/{}", self.base_url, path);
        let req = self
            .http_client
            .request(method, url)
            .header("OpenAI-Beta", "assistants=v2");
        match self.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    async fn execute<T: for<'de> Deserialize<'de>>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MynaError::Thread(format!("HTTP {}: {}", status, body)));
        }

        Ok(response.json::<T>().await?)
    }
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Deserialize)]
struct RunError {
    message: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Deserialize)]
struct MessageObject {
    content: Vec<MessageContent>,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Deserialize)]
struct MessageText {
    value: String,
}

#[async_trait]
impl ConversationClient for HttpThreadClient {
    async fn create_thread(&self, instructions: &str) -> Result<String> {
        // Runs go through a shared assistant, so per-domain instructions
        // are seeded as the thread's opening message.
        let opening = format!(
            "Follow these instructions for the whole conversation:\n{}",
            instructions
        );
        let body = json!({
            "messages": [{ "role": "user", "content": opening }]
        });
        let created: Created = self
            .execute(self.request(reqwest::Method::POST, "threads").json(&body))
            .await?;
        Ok(created.id)
    }

    async fn send(&self, thread_id: &str, message: &str) -> Result<()> {
        let body = json!({ "role": "user", "content": message });
        let _: Created = self
            .execute(
                self.request(reqwest::Method::POST, &format!("threads/{}/messages", thread_id))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str) -> Result<String> {
        let body = json!({ "assistant_id": self.assistant_id });
        let created: Created = self
            .execute(
                self.request(reqwest::Method::POST, &format!("threads/{}/runs", thread_id))
                    .json(&body),
            )
            .await?;
        Ok(created.id)
    }

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunStatus> {
        let run: RunObject = self
            .execute(self.request(
                reqwest::Method::GET,
                &format!("threads/{}/runs/{}", thread_id, run_id),
            ))
            .await?;
        Ok(RunStatus::from_wire(
            &run.status,
            run.last_error.as_ref().map(|e| e.message.as_str()),
        ))
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()> {
        let _: RunObject = self
            .execute(self.request(
                reqwest::Method::POST,
                &format!("threads/{}/runs/{}/cancel", thread_id, run_id),
            ))
            .await?;
        Ok(())
    }

    async fn latest_message(&self, thread_id: &str) -> Result<String> {
        let list: MessageList = self
            .execute(self.request(
                reqwest::Method::GET,
                &format!("threads/{}/messages?limit=1&order=desc", thread_id),
            ))
            .await?;

        list.data
            .into_iter()
            .next()
            .and_then(|m| m.content.into_iter().find_map(|c| c.text))
            .map(|t| t.value)
            .ok_or_else(|| MynaError::Thread(format!("thread {} has no text reply", thread_id)))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .execute(self.request(reqwest::Method::DELETE, &format!("threads/{}", thread_id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_status_mapping() {
        assert_eq!(RunStatus::from_wire("queued", None), RunStatus::Queued);
        assert_eq!(RunStatus::from_wire("cancelling", None), RunStatus::InProgress);
        assert_eq!(RunStatus::from_wire("completed", None), RunStatus::Completed);
        assert_eq!(
            RunStatus::from_wire("failed", Some("rate limit")),
            RunStatus::Failed("failed: rate limit".to_string())
        );
        assert_eq!(
            RunStatus::from_wire("expired", None),
            RunStatus::Failed("expired".to_string())
        );
    }

    #[test]
    fn test_client_requires_assistant() {
        let threads = ThreadConfig {
            assistant_id: None,
            ..ThreadConfig::default()
        };
        assert!(HttpThreadClient::new(&LLMServiceConfig::default(), &threads).is_err());
    }
}
