mod moonshot;

pub use moonshot::MoonshotClient;

use serde::{Deserialize, Serialize};

/// What the remote processor should do with copied content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Translate,
    Explain,
    Summarize,
    Analyze,
}

impl Action {
    /// Task sentence prepended to the content.
    pub fn prompt(&self) -> &'static str {
        match self {
            Action::Translate => "请将其翻译成中文（如原文为中文则翻译为英文）",
            Action::Explain => "请解释这段内容",
            Action::Summarize => "请简要总结核心要点",
            Action::Analyze => "请分析这段内容",
        }
    }

    /// Short label for notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Translate => "Translation",
            Action::Explain => "Explanation",
            Action::Summarize => "Summary",
            Action::Analyze => "Analysis",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned status {0}: {1}")]
    Status(u16, String),
    #[error("malformed API response: {0}")]
    BadResponse(String),
}

/// Remote content processor. Implementations block; the orchestrator calls
/// this from a background thread and marshals the result back.
pub trait ContentProcessor: Send + Sync {
    fn process(&self, action: Action, content: &str) -> Result<String, ProcessorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&Action::Translate).unwrap(), "\"translate\"");
        let back: Action = serde_json::from_str("\"summarize\"").unwrap();
        assert_eq!(back, Action::Summarize);
    }

    #[test]
    fn every_action_has_a_prompt() {
        for action in [
            Action::Translate,
            Action::Explain,
            Action::Summarize,
            Action::Analyze,
        ] {
            assert!(!action.prompt().is_empty());
            assert!(!action.label().is_empty());
        }
    }
}
