// OpenAI-compatible chat-completions client for the Moonshot (Kimi) API.
// Blocking by design; always driven from the orchestrator's worker thread.

use super::{Action, ContentProcessor, ProcessorError};
use crate::config::ProcessorSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "你是 Kimi，一个专业的助手。你总是能给出精炼、无废话的回答。";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.3;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub struct MoonshotClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl MoonshotClient {
    pub fn from_settings(settings: &ProcessorSettings) -> Result<Self, ProcessorError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(ProcessorError::MissingApiKey)?;
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProcessorError::Request(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    fn user_message(action: Action, content: &str) -> String {
        format!("{}：\n\n{}", action.prompt(), content)
    }
}

impl ContentProcessor for MoonshotClient {
    fn process(&self, action: Action, content: &str) -> Result<String, ProcessorError> {
        let user = Self::user_message(action, content);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.base_url);
        crate::debug!(model = %self.model, ?action, "dispatching processor request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| ProcessorError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProcessorError::Status(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| ProcessorError::BadResponse(e.to_string()))?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProcessorError::BadResponse("empty choices".into()))?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_key() -> ProcessorSettings {
        ProcessorSettings {
            api_key: Some("sk-test".into()),
            ..ProcessorSettings::default()
        }
    }

    #[test]
    fn missing_key_is_rejected_up_front() {
        let settings = ProcessorSettings::default();
        assert!(matches!(
            MoonshotClient::from_settings(&settings),
            Err(ProcessorError::MissingApiKey)
        ));
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let settings = ProcessorSettings {
            api_key: Some(String::new()),
            ..ProcessorSettings::default()
        };
        assert!(matches!(
            MoonshotClient::from_settings(&settings),
            Err(ProcessorError::MissingApiKey)
        ));
    }

    #[test]
    fn trailing_slash_in_base_url_is_normalized() {
        let settings = ProcessorSettings {
            base_url: "https://api.moonshot.cn/v1/".into(),
            ..settings_with_key()
        };
        let client = MoonshotClient::from_settings(&settings).unwrap();
        assert_eq!(client.base_url, "https://api.moonshot.cn/v1");
    }

    #[test]
    fn user_message_carries_task_and_content() {
        let msg = MoonshotClient::user_message(Action::Explain, "fn main() {}");
        assert!(msg.starts_with(Action::Explain.prompt()));
        assert!(msg.ends_with("fn main() {}"));
    }

    #[test]
    fn response_parsing_takes_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":" 你好 "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, " 你好 ");
    }
}
