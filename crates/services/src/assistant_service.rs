use std::sync::Arc;

use quiz_core::model::UserId;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storage::repository::{ChatHistoryRepository, ChatMessage, ChatRole, DEFAULT_HISTORY_WINDOW};

use crate::Clock;
use crate::config::AssistantConfig;
use crate::error::AssistantError;

/// Free-text fallback: answers messages that are not quiz commands.
#[derive(Clone)]
pub struct AssistantService {
    client: Client,
    clock: Clock,
    config: Option<AssistantConfig>,
    history: Arc<dyn ChatHistoryRepository>,
    window: usize,
}

impl AssistantService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: Option<AssistantConfig>,
        history: Arc<dyn ChatHistoryRepository>,
    ) -> Self {
        Self {
            client: Client::new(),
            clock,
            config,
            history,
            window: DEFAULT_HISTORY_WINDOW,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Reply to `message` using the user's recent conversation as context.
    ///
    /// The user message is stored before the request and the reply after it,
    /// both trimmed to the rolling window.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError` when the service is disabled, the message is
    /// blank, the request fails, or the response is empty.
    pub async fn reply(&self, user_id: UserId, message: &str) -> Result<String, AssistantError> {
        let config = self.config.as_ref().ok_or(AssistantError::Disabled)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        self.history
            .append_message(
                user_id,
                &ChatMessage::new(ChatRole::User, message, self.clock.now()),
                self.window,
            )
            .await?;
        let history = self.history.recent_messages(user_id, self.window).await?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = build_request(config, &history);
        tracing::debug!(%user_id, messages = payload.messages.len(), "assistant request");

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(%user_id, status = %response.status(), "assistant request rejected");
            return Err(AssistantError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AssistantError::EmptyResponse)?;

        self.history
            .append_message(
                user_id,
                &ChatMessage::new(ChatRole::Assistant, content.as_str(), self.clock.now()),
                self.window,
            )
            .await?;

        Ok(content)
    }
}

fn build_request(config: &AssistantConfig, history: &[ChatMessage]) -> ChatRequest {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(WireMessage {
        role: "system",
        content: config.system_prompt.clone(),
    });
    messages.extend(history.iter().map(|message| WireMessage {
        role: message.role.as_str(),
        content: message.content.clone(),
    }));
    ChatRequest {
        model: config.model.clone(),
        messages,
        temperature: 0.7,
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryRepository;

    fn config() -> AssistantConfig {
        AssistantConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: "sk-test".into(),
            model: "tiny".into(),
            system_prompt: "Be brief.".into(),
        }
    }

    #[test]
    fn request_starts_with_system_prompt() {
        let history = vec![
            ChatMessage::new(ChatRole::User, "hi", fixed_now()),
            ChatMessage::new(ChatRole::Assistant, "hello!", fixed_now()),
            ChatMessage::new(ChatRole::User, "what is a gerund?", fixed_now()),
        ];
        let request = build_request(&config(), &history);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "tiny");
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Be brief.");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "what is a gerund?");
    }

    #[test]
    fn response_without_content_is_empty() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(body.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn disabled_without_config() {
        let repo = InMemoryRepository::new();
        let assistant = AssistantService::new(fixed_clock(), None, Arc::new(repo.clone()));
        assert!(!assistant.enabled());
        assert!(matches!(
            assistant.reply(UserId::new(1), "hello").await,
            Err(AssistantError::Disabled)
        ));
        assert!(repo.recent_messages(UserId::new(1), 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_message_is_rejected_before_storing() {
        let repo = InMemoryRepository::new();
        let assistant = AssistantService::new(fixed_clock(), Some(config()), Arc::new(repo.clone()));
        assert!(matches!(
            assistant.reply(UserId::new(1), "   ").await,
            Err(AssistantError::EmptyMessage)
        ));
        assert!(repo.recent_messages(UserId::new(1), 5).await.unwrap().is_empty());
    }
}
