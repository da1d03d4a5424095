use async_trait::async_trait;
use serde_json::{json, Value};
use sihteeri::agent::{
    Agent, AssistantTurn, ChatMessage, FunctionCall, ModelProvider, ToolCallRequest,
    MAX_MODEL_ROUNDS,
};
use sihteeri::components::google_calendar::models::{EventDraft, EventRecord};
use sihteeri::components::google_calendar::CalendarGateway;
use sihteeri::components::identity_cache::IdentityCache;
use sihteeri::config::Config;
use sihteeri::error::{model_provider_error, AppResult, GatewayError, GatewayResult};
use sihteeri::tools::{CalendarTools, ToolDefinition, CREATE_TOOL, DELETE_TOOL, QUERY_TOOL};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Plays back a fixed sequence of model turns and records every
/// conversation it was shown, so tests can assert what the agent loop
/// folded back in between calls. Once the script runs out the last
/// turn repeats, which lets a single tool-call turn model a model
/// stuck asking for tools.
struct ScriptedProvider {
    script: Vec<AssistantTurn>,
    cursor: Mutex<usize>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    fn new(script: Vec<AssistantTurn>) -> Arc<Self> {
        Arc::new(Self {
            script,
            cursor: Mutex::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    async fn calls(&self) -> usize {
        self.seen.lock().await.len()
    }

    async fn conversation(&self, index: usize) -> Vec<ChatMessage> {
        self.seen.lock().await[index].clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> AppResult<AssistantTurn> {
        self.seen.lock().await.push(messages.to_vec());

        let mut cursor = self.cursor.lock().await;
        let turn = self.script[(*cursor).min(self.script.len() - 1)].clone();
        *cursor += 1;
        Ok(turn)
    }
}

/// A provider whose transport is down
struct FailingProvider;

#[async_trait]
impl ModelProvider for FailingProvider {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> AppResult<AssistantTurn> {
        Err(model_provider_error("connection refused"))
    }
}

/// Minimal in-memory calendar for the agent tests: a map of events,
/// with listings optionally forced to fail
#[derive(Clone, Default)]
struct StubGateway {
    state: Arc<Mutex<StubState>>,
}

#[derive(Default)]
struct StubState {
    events: HashMap<String, EventRecord>,
    next_id: u32,
    list_fault: Option<GatewayError>,
}

impl StubGateway {
    async fn seed_event(&self, id: &str, summary: &str) {
        let mut state = self.state.lock().await;
        state.events.insert(
            id.to_string(),
            EventRecord {
                id: id.to_string(),
                summary: Some(summary.to_string()),
                ..Default::default()
            },
        );
    }

    async fn fail_listing(&self, err: GatewayError) {
        let mut state = self.state.lock().await;
        state.list_fault = Some(err);
    }
}

#[async_trait]
impl CalendarGateway for StubGateway {
    async fn list_events(
        &self,
        _window_start: &str,
        _window_end: &str,
    ) -> GatewayResult<Vec<EventRecord>> {
        let state = self.state.lock().await;
        if let Some(err) = &state.list_fault {
            return Err(err.clone());
        }
        Ok(state.events.values().cloned().collect())
    }

    async fn insert_event(&self, draft: EventDraft) -> GatewayResult<EventRecord> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let record = EventRecord {
            id: format!("ev-{}", state.next_id),
            summary: draft.summary,
            location: draft.location,
            description: draft.description,
            start: Some(draft.start),
            end: Some(draft.end),
        };
        state.events.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_event(&self, event_id: &str) -> GatewayResult<EventRecord> {
        let state = self.state.lock().await;
        state
            .events
            .get(event_id)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }

    async fn update_event(
        &self,
        event_id: &str,
        record: EventRecord,
    ) -> GatewayResult<EventRecord> {
        let mut state = self.state.lock().await;
        if !state.events.contains_key(event_id) {
            return Err(GatewayError::NotFound);
        }
        let mut record = record;
        record.id = event_id.to_string();
        state.events.insert(event_id.to_string(), record.clone());
        Ok(record)
    }

    async fn delete_event(&self, event_id: &str) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state
            .events
            .remove(event_id)
            .map(|_| ())
            .ok_or(GatewayError::NotFound)
    }
}

/// In-memory stand-in for the Redis-backed identity cache
#[derive(Clone, Default)]
struct MockCache {
    mappings: Arc<Mutex<HashMap<String, String>>>,
}

impl MockCache {
    async fn seed_mapping(&self, name: &str, event_id: &str) {
        let mut mappings = self.mappings.lock().await;
        mappings.insert(name.to_string(), event_id.to_string());
    }
}

#[async_trait]
impl IdentityCache for MockCache {
    async fn exists(&self, name: &str) -> AppResult<bool> {
        let mappings = self.mappings.lock().await;
        Ok(mappings.contains_key(name))
    }

    async fn get(&self, name: &str) -> AppResult<Option<String>> {
        let mappings = self.mappings.lock().await;
        Ok(mappings.get(name).cloned())
    }

    async fn register(&self, name: &str, event_id: &str) -> AppResult<bool> {
        let mut mappings = self.mappings.lock().await;
        if mappings.contains_key(name) {
            return Ok(false);
        }
        mappings.insert(name.to_string(), event_id.to_string());
        Ok(true)
    }

    async fn remove(&self, name: &str) -> AppResult<()> {
        let mut mappings = self.mappings.lock().await;
        mappings.remove(name);
        Ok(())
    }
}

fn test_config() -> Arc<RwLock<Config>> {
    Arc::new(RwLock::new(Config {
        openai_api_key: String::new(),
        openai_model: "gpt-4o".to_string(),
        google_client_id: String::new(),
        google_client_secret: String::new(),
        google_calendar_id: "primary".to_string(),
        redis_url: "redis://127.0.0.1:6379".to_string(),
        timezone: "America/Los_Angeles".to_string(),
        request_timeout_secs: 30,
    }))
}

fn agent_over(
    provider: Arc<ScriptedProvider>,
    gateway: &StubGateway,
    cache: &MockCache,
) -> Agent {
    let config = test_config();
    let tools = CalendarTools::new(
        Arc::clone(&config),
        Arc::new(gateway.clone()),
        Arc::new(cache.clone()),
    );
    Agent::new(config, provider, tools)
}

/// One assistant turn asking for a single tool call
fn tool_call_turn(id: &str, name: &str, arguments: Value) -> AssistantTurn {
    AssistantTurn::ToolCalls(ChatMessage {
        role: "assistant".to_string(),
        content: None,
        tool_calls: vec![tool_call_request(id, name, arguments)],
        tool_call_id: None,
    })
}

fn tool_call_request(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

fn query_window() -> Value {
    json!({
        "startDateTime": "2025-06-01T00:00:00Z",
        "endDateTime": "2025-06-02T00:00:00Z",
    })
}

/// A fault within the retry budget goes back to the model as the tool
/// result, suffixed with the retry instruction
#[tokio::test]
async fn test_fault_within_budget_is_folded_back() {
    let provider = ScriptedProvider::new(vec![
        tool_call_turn("call-1", DELETE_TOOL, json!({ "eventName": "Ghost" })),
        AssistantTurn::Text("All done.".to_string()),
    ]);
    let gateway = StubGateway::default();
    let cache = MockCache::default();
    let agent = agent_over(Arc::clone(&provider), &gateway, &cache);

    let answer = agent.run("cancel the ghost meeting").await.unwrap();
    assert_eq!(answer, "All done.");

    // The second model call saw its own assistant message first, then
    // the fault as a tool message inviting a correction
    let second = provider.conversation(1).await;
    assert_eq!(second[2].role, "assistant");
    assert!(!second[2].tool_calls.is_empty());

    let tool_message = second.last().unwrap();
    assert_eq!(tool_message.role, "tool");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call-1"));

    let content = tool_message.content.as_deref().unwrap();
    assert!(content.starts_with("Ghost is not an entry in your calendar!"));
    assert!(content.ends_with("Fix the errors and try again."));
}

/// A fault beyond the budget ends the run with the fault message as
/// the answer, verbatim, without the retry suffix
#[tokio::test]
async fn test_fault_beyond_budget_surfaces_verbatim() {
    let provider = ScriptedProvider::new(vec![
        tool_call_turn("call-1", DELETE_TOOL, json!({ "eventName": "Ghost" })),
        tool_call_turn("call-2", DELETE_TOOL, json!({ "eventName": "Ghost" })),
        AssistantTurn::Text("Never reached.".to_string()),
    ]);
    let gateway = StubGateway::default();
    let cache = MockCache::default();
    let agent = agent_over(Arc::clone(&provider), &gateway, &cache);

    let answer = agent.run("cancel the ghost meeting").await.unwrap();

    assert_eq!(answer, "Ghost is not an entry in your calendar!");
    assert_eq!(provider.calls().await, 2);
}

/// A success in between clears the failure count, so two separated
/// faults on the same tool both stay within budget
#[tokio::test]
async fn test_success_resets_failure_count() {
    let provider = ScriptedProvider::new(vec![
        tool_call_turn("call-1", DELETE_TOOL, json!({ "eventName": "Ghost" })),
        tool_call_turn("call-2", DELETE_TOOL, json!({ "eventName": "Dentist" })),
        tool_call_turn("call-3", DELETE_TOOL, json!({ "eventName": "Ghost" })),
        AssistantTurn::Text("Done.".to_string()),
    ]);
    let gateway = StubGateway::default();
    gateway.seed_event("ev-1", "Dentist").await;
    let cache = MockCache::default();
    cache.seed_mapping("Dentist", "ev-1").await;
    let agent = agent_over(Arc::clone(&provider), &gateway, &cache);

    let answer = agent.run("tidy up my calendar").await.unwrap();

    // Without the reset the third call would have exhausted the budget
    // and surfaced the Ghost fault instead
    assert_eq!(answer, "Done.");
    assert_eq!(provider.calls().await, 4);
}

/// Listing gets a budget of two corrections; the third fault in a row
/// is surfaced
#[tokio::test]
async fn test_query_budget_allows_two_corrections() {
    let provider = ScriptedProvider::new(vec![
        tool_call_turn("call-1", QUERY_TOOL, query_window()),
        tool_call_turn("call-2", QUERY_TOOL, query_window()),
        tool_call_turn("call-3", QUERY_TOOL, query_window()),
        AssistantTurn::Text("Never reached.".to_string()),
    ]);
    let gateway = StubGateway::default();
    gateway
        .fail_listing(GatewayError::Service("HTTP 500 - backend".to_string()))
        .await;
    let cache = MockCache::default();
    let agent = agent_over(Arc::clone(&provider), &gateway, &cache);

    let answer = agent.run("what's on tomorrow?").await.unwrap();

    assert!(answer.contains("HTTP 500"));
    assert!(!answer.contains("Fix the errors"));
    assert_eq!(provider.calls().await, 3);
}

/// A model that never stops asking for tools is cut off after the
/// round limit with an apology, not an error
#[tokio::test]
async fn test_model_round_guard_stops_tool_loops() {
    // Script of one tool-call turn; it repeats forever
    let provider = ScriptedProvider::new(vec![tool_call_turn(
        "call-1",
        QUERY_TOOL,
        query_window(),
    )]);
    let gateway = StubGateway::default();
    let cache = MockCache::default();
    let agent = agent_over(Arc::clone(&provider), &gateway, &cache);

    let answer = agent.run("loop forever").await.unwrap();

    assert_eq!(
        answer,
        "I'm sorry, I wasn't able to finish that request. Could you try rephrasing it?"
    );
    assert_eq!(provider.calls().await, MAX_MODEL_ROUNDS);
}

/// Several tool calls in one assistant turn run one at a time, in
/// order, each answered under its own call id
#[tokio::test]
async fn test_tool_calls_run_sequentially_in_order() {
    let args = json!({
        "summary": "Dentist",
        "startDateTime": "2025-06-01T09:00:00-07:00",
        "endDateTime": "2025-06-01T10:00:00-07:00",
    });
    let provider = ScriptedProvider::new(vec![
        AssistantTurn::ToolCalls(ChatMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: vec![
                tool_call_request("call-1", CREATE_TOOL, args.clone()),
                tool_call_request("call-2", CREATE_TOOL, args),
            ],
            tool_call_id: None,
        }),
        AssistantTurn::Text("Both handled.".to_string()),
    ]);
    let gateway = StubGateway::default();
    let cache = MockCache::default();
    let agent = agent_over(Arc::clone(&provider), &gateway, &cache);

    let answer = agent.run("book the dentist, twice").await.unwrap();
    assert_eq!(answer, "Both handled.");

    // [system, user, assistant, tool result, tool result]
    let second = provider.conversation(1).await;
    assert_eq!(second.len(), 5);
    assert_eq!(second[3].tool_call_id.as_deref(), Some("call-1"));
    assert_eq!(second[4].tool_call_id.as_deref(), Some("call-2"));

    // The first create succeeded; the duplicate came back as a fault
    let first_result: Value =
        serde_json::from_str(second[3].content.as_deref().unwrap()).unwrap();
    assert_eq!(first_result["summary"], "Dentist");
    assert!(second[4]
        .content
        .as_deref()
        .unwrap()
        .contains("already exists in your events"));
}

/// Every run is its own conversation: nothing carries over from the
/// previous utterance
#[tokio::test]
async fn test_each_run_starts_a_fresh_conversation() {
    let provider = ScriptedProvider::new(vec![
        AssistantTurn::Text("First answer.".to_string()),
        AssistantTurn::Text("Second answer.".to_string()),
    ]);
    let gateway = StubGateway::default();
    let cache = MockCache::default();
    let agent = agent_over(Arc::clone(&provider), &gateway, &cache);

    assert_eq!(agent.run("one").await.unwrap(), "First answer.");
    assert_eq!(agent.run("two").await.unwrap(), "Second answer.");

    // Both conversations open with just the instruction and the user
    let first = provider.conversation(0).await;
    let second = provider.conversation(1).await;
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].role, "system");
    assert!(second[0]
        .content
        .as_deref()
        .unwrap()
        .contains("personal assistant that specializes in calendars"));
    assert_eq!(second[1].content.as_deref(), Some("two"));
}

/// A provider transport failure propagates as an application error for
/// the REPL to downgrade, never a panic
#[tokio::test]
async fn test_provider_failure_is_an_application_error() {
    let config = test_config();
    let tools = CalendarTools::new(
        Arc::clone(&config),
        Arc::new(StubGateway::default()),
        Arc::new(MockCache::default()),
    );
    let agent = Agent::new(config, Arc::new(FailingProvider), tools);

    let result = agent.run("hello").await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("connection refused"));
}
