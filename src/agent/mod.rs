pub mod conversation;
pub mod provider;

pub use conversation::{ChatMessage, FunctionCall, ToolCallRequest};
pub use provider::{AssistantTurn, ModelProvider, OpenAiProvider};

use crate::config::Config;
use crate::error::AppResult;
use crate::tools::{self, CalendarTools, ToolDefinition, MUTATION_RETRY_BUDGET};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Upper bound on model turns per utterance, so a model that keeps
/// asking for tools cannot spin forever
pub const MAX_MODEL_ROUNDS: usize = 8;

/// The conversational controller: one utterance in, one answer out,
/// with any number of tool invocations in between.
pub struct Agent {
    config: Arc<RwLock<Config>>,
    provider: Arc<dyn ModelProvider>,
    tools: CalendarTools,
    definitions: Vec<ToolDefinition>,
}

impl Agent {
    pub fn new(
        config: Arc<RwLock<Config>>,
        provider: Arc<dyn ModelProvider>,
        tools: CalendarTools,
    ) -> Self {
        Self {
            config,
            provider,
            tools,
            definitions: tools::definitions(),
        }
    }

    /// Run a single user utterance to a final answer. Each utterance is
    /// its own conversation; nothing carries over between calls.
    pub async fn run(&self, user_input: &str) -> AppResult<String> {
        let mut conversation = vec![
            ChatMessage::system(self.system_prompt().await),
            ChatMessage::user(user_input),
        ];

        // Consecutive failures per tool, cleared on that tool's success
        let mut failure_counts: HashMap<String, u32> = HashMap::new();

        for _ in 0..MAX_MODEL_ROUNDS {
            let turn = self
                .provider
                .complete(&conversation, &self.definitions)
                .await?;

            let message = match turn {
                AssistantTurn::Text(text) => return Ok(text),
                AssistantTurn::ToolCalls(message) => message,
            };

            let calls = message.tool_calls.clone();
            conversation.push(message);

            // Tools run one at a time, in the order the model asked
            for call in calls {
                let tool_name = call.function.name.clone();

                match self
                    .tools
                    .dispatch(&tool_name, &call.function.arguments)
                    .await
                {
                    Ok(result) => {
                        failure_counts.remove(&tool_name);
                        conversation.push(ChatMessage::tool(call.id, result));
                    }
                    Err(fault) => {
                        let failures = failure_counts.entry(tool_name.clone()).or_insert(0);
                        *failures += 1;

                        // Within budget the model gets the fault back and
                        // may correct itself; beyond it the user does
                        if *failures > self.retry_budget(&tool_name) {
                            info!("Tool {} exhausted its retry budget", tool_name);
                            return Ok(fault.message().to_string());
                        }

                        conversation.push(ChatMessage::tool(call.id, fault.retry_prompt()));
                    }
                }
            }
        }

        warn!("Conversation exceeded {} model rounds", MAX_MODEL_ROUNDS);
        Ok("I'm sorry, I wasn't able to finish that request. Could you try rephrasing it?"
            .to_string())
    }

    /// Standing instruction with today's date in the configured timezone
    async fn system_prompt(&self) -> String {
        let timezone = {
            let config_read = self.config.read().await;
            config_read.timezone_tz()
        };
        let today = Utc::now().with_timezone(&timezone).to_rfc3339();

        format!(
            "You are a personal assistant that specializes in calendars and scheduling. \
             When using the date and time as arguments for tools, convert the date and time \
             into ISO 8601 format first. You can assume that today's date is {}. \
             If you are unsure how to proceed with a task, ask clarifying questions for \
             additional input. Based on the inputs received, use the correct function(s) \
             (if needed) to help with the task.",
            today
        )
    }

    fn retry_budget(&self, tool_name: &str) -> u32 {
        self.definitions
            .iter()
            .find(|definition| definition.name == tool_name)
            .map(|definition| definition.max_retries)
            .unwrap_or(MUTATION_RETRY_BUDGET)
    }
}
