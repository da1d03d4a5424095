use super::actor::GoogleCalendarActorHandle;
use super::models::{EventDraft, EventRecord};
use super::CalendarGateway;
use crate::components::identity_cache::IdentityCacheHandle;
use crate::config::Config;
use crate::error::GatewayResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Handle for interacting with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarHandle {
    actor_handle: GoogleCalendarActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl GoogleCalendarHandle {
    /// Create a new GoogleCalendarHandle and spawn the actor
    pub fn new(config: Arc<RwLock<Config>>, cache_handle: IdentityCacheHandle) -> Self {
        use super::actor::GoogleCalendarActor;

        // Create the actor and get its handle
        let (mut actor, handle) = GoogleCalendarActor::new(config, cache_handle);

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> GatewayResult<()> {
        self.actor_handle.shutdown().await
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendarHandle {
    async fn list_events(
        &self,
        window_start: &str,
        window_end: &str,
    ) -> GatewayResult<Vec<EventRecord>> {
        self.actor_handle.list_events(window_start, window_end).await
    }

    async fn insert_event(&self, draft: EventDraft) -> GatewayResult<EventRecord> {
        self.actor_handle.insert_event(draft).await
    }

    async fn get_event(&self, event_id: &str) -> GatewayResult<EventRecord> {
        self.actor_handle.get_event(event_id).await
    }

    async fn update_event(
        &self,
        event_id: &str,
        record: EventRecord,
    ) -> GatewayResult<EventRecord> {
        self.actor_handle.update_event(event_id, record).await
    }

    async fn delete_event(&self, event_id: &str) -> GatewayResult<()> {
        self.actor_handle.delete_event(event_id).await
    }
}
