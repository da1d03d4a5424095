mod actor;
mod handle;
pub mod models;
pub mod time;
pub mod token;

pub use handle::GoogleCalendarHandle;
pub use models::{EventDraft, EventRecord, EventTime};

use crate::error::GatewayResult;
use async_trait::async_trait;

/// Hard cap on the number of events a single listing returns
pub const MAX_EVENTS_PER_QUERY: usize = 5;

/// Uniform surface over the calendar service. The real implementation
/// talks to Google Calendar; tests substitute in-memory doubles.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// List events falling inside the half-open window. An empty window
    /// is an empty vec, not a fault.
    async fn list_events(
        &self,
        window_start: &str,
        window_end: &str,
    ) -> GatewayResult<Vec<EventRecord>>;

    /// Create a new event from the draft and return the stored record
    async fn insert_event(&self, draft: EventDraft) -> GatewayResult<EventRecord>;

    /// Fetch one event by identifier. NotFound when the identifier no
    /// longer resolves.
    async fn get_event(&self, event_id: &str) -> GatewayResult<EventRecord>;

    /// Replace an event's content wholesale and return the stored record
    async fn update_event(&self, event_id: &str, record: EventRecord)
        -> GatewayResult<EventRecord>;

    /// Delete an event by identifier. NotFound when already gone.
    async fn delete_event(&self, event_id: &str) -> GatewayResult<()>;
}
