mod calendar;
pub mod params;

pub use calendar::CalendarTools;

use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde_json::{json, Value};

/// Wire names of the four calendar tools
pub const QUERY_TOOL: &str = "get_events_from_timeperiod";
pub const CREATE_TOOL: &str = "create_event";
pub const DELETE_TOOL: &str = "delete_event";
pub const UPDATE_TOOL: &str = "update_event";

/// How many times the agent loop lets a tool fail before the fault is
/// surfaced to the user. Listing tolerates an extra attempt because the
/// model routinely needs one correction to get the window right.
pub const QUERY_RETRY_BUDGET: u32 = 2;
pub const MUTATION_RETRY_BUDGET: u32 = 1;

/// A callable tool as declared to the model provider
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
    pub max_retries: u32,
}

/// Declarations for the four calendar tools, in the shape the model
/// provider forwards to the model
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: QUERY_TOOL,
            description: "Look up calendar events between two points in time. \
                          Returns at most five events, earliest first.",
            parameters: schema_for::<params::QueryArgs>(),
            max_retries: QUERY_RETRY_BUDGET,
        },
        ToolDefinition {
            name: CREATE_TOOL,
            description: "Add a new event to the calendar under a unique name.",
            parameters: schema_for::<params::CreateArgs>(),
            max_retries: MUTATION_RETRY_BUDGET,
        },
        ToolDefinition {
            name: DELETE_TOOL,
            description: "Remove an event from the calendar by the name it was created under.",
            parameters: schema_for::<params::DeleteArgs>(),
            max_retries: MUTATION_RETRY_BUDGET,
        },
        ToolDefinition {
            name: UPDATE_TOOL,
            description: "Change an existing event's name, location, description or times. \
                          Only the fields provided are changed.",
            parameters: schema_for::<params::UpdateArgs>(),
            max_retries: MUTATION_RETRY_BUDGET,
        },
    ]
}

/// JSON schema for a tool's argument struct
fn schema_for<T: JsonSchema>() -> Value {
    let schema = SchemaGenerator::default().into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }))
}
