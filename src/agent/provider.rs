use super::conversation::ChatMessage;
use crate::config::Config;
use crate::error::{model_provider_error, AppResult};
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// What the model did with the conversation so far
#[derive(Debug, Clone)]
pub enum AssistantTurn {
    /// The conversation is over; this is the answer
    Text(String),
    /// The model asked for tools. The carried assistant message must be
    /// folded into the conversation before the tool results.
    ToolCalls(ChatMessage),
}

/// The seam between the agent loop and whatever produces model turns
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> AppResult<AssistantTurn>;
}

/// OpenAI chat-completions implementation of the model seam
pub struct OpenAiProvider {
    config: Arc<RwLock<Config>>,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSchema<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
}

#[derive(Serialize)]
struct ToolSchema<'a> {
    #[serde(rename = "type")]
    schema_type: &'a str,
    function: FunctionSchema<'a>,
}

#[derive(Serialize)]
struct FunctionSchema<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiProvider {
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> AppResult<AssistantTurn> {
        let (api_key, model, timeout_secs) = {
            let config_read = self.config.read().await;
            (
                config_read.openai_api_key.clone(),
                config_read.openai_model.clone(),
                config_read.request_timeout_secs,
            )
        };

        let tool_schemas: Vec<ToolSchema> = tools
            .iter()
            .map(|tool| ToolSchema {
                schema_type: "function",
                function: FunctionSchema {
                    name: tool.name,
                    description: tool.description,
                    parameters: &tool.parameters,
                },
            })
            .collect();

        let request = ChatRequest {
            model: &model,
            messages,
            tool_choice: if tool_schemas.is_empty() {
                None
            } else {
                Some("auto")
            },
            tools: tool_schemas,
        };

        debug!("Requesting completion from {} with {} messages", model, messages.len());

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| model_provider_error(&format!("Failed to reach the model: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(model_provider_error(&format!(
                "Model request failed: HTTP {} - {}",
                status, error_body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| model_provider_error(&format!("Failed to parse model response: {}", e)))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| model_provider_error("Model response contained no choices"))?;

        if message.tool_calls.is_empty() {
            Ok(AssistantTurn::Text(message.content.unwrap_or_default()))
        } else {
            Ok(AssistantTurn::ToolCalls(message))
        }
    }
}
