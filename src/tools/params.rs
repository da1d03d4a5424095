use schemars::JsonSchema;
use serde::Deserialize;

/// Arguments for the event listing tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    /// Start of the window as an ISO 8601 date-time string
    pub start_date_time: String,
    /// End of the window as an ISO 8601 date-time string
    pub end_date_time: String,
}

/// Arguments for the event creation tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateArgs {
    /// Name of the event, used later to refer back to it
    pub summary: Option<String>,
    /// Where the event takes place
    pub location: Option<String>,
    /// Free-form details about the event
    pub description: Option<String>,
    /// Event start as an ISO 8601 date-time string
    pub start_date_time: Option<String>,
    /// Event end as an ISO 8601 date-time string
    pub end_date_time: Option<String>,
}

/// Arguments for the event deletion tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteArgs {
    /// Name the event was created under
    pub event_name: String,
}

/// Arguments for the event update tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArgs {
    /// Name the event was created under
    pub event_name: String,
    /// New name for the event
    pub summary: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New start as an ISO 8601 date-time string
    pub start_date_time: Option<String>,
    /// New end as an ISO 8601 date-time string
    pub end_date_time: Option<String>,
}
