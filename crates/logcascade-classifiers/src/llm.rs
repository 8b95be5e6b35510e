//! LLM fallback strategy (last stage)
//!
//! Talks to any OpenAI-compatible chat completions endpoint (Groq by
//! default). The model is asked to wrap its answer in `<category>` tags; a
//! reply without a usable tag becomes the sentinel. Transport, auth and
//! response-format failures are returned as errors so the cascade counts
//! them, and the record still ends up `Unclassified`.

use crate::config::LlmSettings;
use crate::strategy::Strategy;
use logcascade_core::{ChatMessage, Error, Result, Verdict};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

fn category_tag() -> &'static Regex {
    static CATEGORY_TAG: OnceLock<Regex> = OnceLock::new();
    CATEGORY_TAG.get_or_init(|| {
        Regex::new(r"(?s)<category>(.*?)</category>").expect("category pattern is valid")
    })
}

/// Extract the body of the first `<category>` element
pub fn extract_category(content: &str) -> Option<&str> {
    category_tag()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Chat completions request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Remote model classifier
pub struct LlmStrategy {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    categories: Vec<String>,
    restrict_to_categories: bool,
}

impl LlmStrategy {
    /// Build from settings, reading the API key from the configured variable
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            Error::config(format!(
                "Environment variable {} is not set",
                settings.api_key_env
            ))
        })?;
        Self::with_api_key(settings, api_key)
    }

    /// Build from settings with an explicit API key
    pub fn with_api_key(settings: &LlmSettings, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("LLM API key is empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: "llm".to_string(),
            client,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            categories: settings.categories.clone(),
            restrict_to_categories: settings.restrict_to_categories,
        })
    }

    /// Prompt sent for one log message
    pub fn build_prompt(&self, message: &str) -> String {
        let options = self
            .categories
            .iter()
            .enumerate()
            .map(|(idx, category)| format!("({}) {}", idx + 1, category))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Classify the log message into one of these categories: {}.\n\
             If none of them fits, use \"Unclassified\".\n\
             Put the category inside <category> </category> tags.\n\
             Log message: {}",
            options, message
        )
    }

    /// Turn the model's raw reply into a verdict
    pub fn parse_reply(&self, content: &str) -> Verdict {
        let Some(category) = extract_category(content) else {
            debug!("LLM reply has no <category> tag");
            return Verdict::Unclassified;
        };

        match Verdict::from_raw(category) {
            Verdict::Label(label) if self.restrict_to_categories => {
                match self
                    .categories
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(label.as_str()))
                {
                    Some(known) => Verdict::label(known),
                    None => {
                        debug!("LLM answered unknown category '{}'", label);
                        Verdict::Unclassified
                    }
                }
            }
            Verdict::Label(label) => Verdict::Label(label),
            _ => Verdict::Unclassified,
        }
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::llm(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::llm(format!("Backend returned {}", status)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Malformed completion: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::llm("Completion has no content"))
    }
}

#[async_trait::async_trait]
impl Strategy for LlmStrategy {
    async fn classify(&self, message: &str) -> Result<Verdict> {
        let content = self.complete(self.build_prompt(message)).await?;
        Ok(self.parse_reply(&content))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
