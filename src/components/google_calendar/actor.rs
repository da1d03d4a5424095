use super::models::{EventDraft, EventRecord, EventsResponse};
use super::token::TokenManager;
use super::MAX_EVENTS_PER_QUERY;
use crate::components::identity_cache::IdentityCacheHandle;
use crate::config::Config;
use crate::error::{GatewayError, GatewayResult};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use url::Url;

/// The Google Calendar actor that processes messages
pub struct GoogleCalendarActor {
    config: Arc<RwLock<Config>>,
    token_manager: TokenManager,
    client: Client,
    command_rx: mpsc::Receiver<GoogleCalendarCommand>,
}

/// Commands that can be sent to the Google Calendar actor
pub enum GoogleCalendarCommand {
    ListEvents(String, String, mpsc::Sender<GatewayResult<Vec<EventRecord>>>),
    InsertEvent(EventDraft, mpsc::Sender<GatewayResult<EventRecord>>),
    GetEvent(String, mpsc::Sender<GatewayResult<EventRecord>>),
    UpdateEvent(String, EventRecord, mpsc::Sender<GatewayResult<EventRecord>>),
    DeleteEvent(String, mpsc::Sender<GatewayResult<()>>),
    Shutdown,
}

/// Handle for communicating with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarActorHandle {
    command_tx: mpsc::Sender<GoogleCalendarCommand>,
}

impl GoogleCalendarActorHandle {
    /// List events falling inside the given window
    pub async fn list_events(
        &self,
        window_start: &str,
        window_end: &str,
    ) -> GatewayResult<Vec<EventRecord>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::ListEvents(
                window_start.to_string(),
                window_end.to_string(),
                response_tx,
            ))
            .await
            .map_err(|e| GatewayError::Service(format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| GatewayError::Service("Response channel closed".to_string()))?
    }

    /// Create a new event from the given draft
    pub async fn insert_event(&self, draft: EventDraft) -> GatewayResult<EventRecord> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::InsertEvent(draft, response_tx))
            .await
            .map_err(|e| GatewayError::Service(format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| GatewayError::Service("Response channel closed".to_string()))?
    }

    /// Fetch a single event by identifier
    pub async fn get_event(&self, event_id: &str) -> GatewayResult<EventRecord> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::GetEvent(
                event_id.to_string(),
                response_tx,
            ))
            .await
            .map_err(|e| GatewayError::Service(format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| GatewayError::Service("Response channel closed".to_string()))?
    }

    /// Replace an event's content wholesale
    pub async fn update_event(
        &self,
        event_id: &str,
        record: EventRecord,
    ) -> GatewayResult<EventRecord> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::UpdateEvent(
                event_id.to_string(),
                record,
                response_tx,
            ))
            .await
            .map_err(|e| GatewayError::Service(format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| GatewayError::Service("Response channel closed".to_string()))?
    }

    /// Delete an event by identifier
    pub async fn delete_event(&self, event_id: &str) -> GatewayResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::DeleteEvent(
                event_id.to_string(),
                response_tx,
            ))
            .await
            .map_err(|e| GatewayError::Service(format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| GatewayError::Service("Response channel closed".to_string()))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> GatewayResult<()> {
        let _ = self.command_tx.send(GoogleCalendarCommand::Shutdown).await;
        Ok(())
    }
}

impl GoogleCalendarActor {
    /// Create a new actor and return its handle
    pub fn new(
        config: Arc<RwLock<Config>>,
        cache_handle: IdentityCacheHandle,
    ) -> (Self, GoogleCalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            config: Arc::clone(&config),
            token_manager: TokenManager::new(Arc::clone(&config), cache_handle),
            client: Client::new(),
            command_rx,
        };

        let handle = GoogleCalendarActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Google Calendar actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                GoogleCalendarCommand::ListEvents(window_start, window_end, response_tx) => {
                    let result = self.list_events(&window_start, &window_end).await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCalendarCommand::InsertEvent(draft, response_tx) => {
                    let result = self.insert_event(&draft).await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCalendarCommand::GetEvent(event_id, response_tx) => {
                    let result = self.get_event(&event_id).await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCalendarCommand::UpdateEvent(event_id, record, response_tx) => {
                    let result = self.update_event(&event_id, &record).await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCalendarCommand::DeleteEvent(event_id, response_tx) => {
                    let result = self.delete_event(&event_id).await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCalendarCommand::Shutdown => {
                    info!("Google Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Google Calendar actor shut down");
    }

    /// Fetch a bearer token for the next request
    async fn access_token(&self) -> GatewayResult<String> {
        let token = self
            .token_manager
            .get_token()
            .await
            .map_err(|e| GatewayError::Service(e.to_string()))?;

        token
            .get("access_token")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .ok_or_else(|| GatewayError::Service("No access token available".to_string()))
    }

    /// Build the events collection URL, or a single event's URL
    async fn events_url(&self, event_id: Option<&str>) -> GatewayResult<Url> {
        // Get calendar ID from config
        let calendar_id = {
            let config_read = self.config.read().await;
            config_read.google_calendar_id.clone()
        };

        let mut url_str = format!(
            "https://www.googleapis.com/calendar/v3/calendars/{}/events",
            calendar_id
        );
        if let Some(id) = event_id {
            url_str.push('/');
            url_str.push_str(id);
        }

        Url::parse(&url_str)
            .map_err(|e| GatewayError::Unknown(format!("Failed to parse URL: {}", e)))
    }

    /// Per-request timeout from config
    async fn request_timeout(&self) -> Duration {
        let secs = {
            let config_read = self.config.read().await;
            config_read.request_timeout_secs
        };
        Duration::from_secs(secs)
    }

    /// Map a non-success HTTP status to the gateway fault shape
    fn classify_status(status: StatusCode, body: String) -> GatewayError {
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => GatewayError::NotFound,
            _ => GatewayError::Service(format!("HTTP {} - {}", status, body)),
        }
    }

    /// Read out a non-success response as a gateway fault
    async fn fault_from_response(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        Self::classify_status(status, error_body)
    }

    /// List events in the window, capped and ordered by the service
    async fn list_events(
        &self,
        window_start: &str,
        window_end: &str,
    ) -> GatewayResult<Vec<EventRecord>> {
        let access_token = self.access_token().await?;
        let mut url = self.events_url(None).await?;

        url.query_pairs_mut()
            .append_pair("timeMin", window_start)
            .append_pair("timeMax", window_end)
            .append_pair("maxResults", &MAX_EVENTS_PER_QUERY.to_string())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        debug!("Listing events between {} and {}", window_start, window_end);

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .timeout(self.request_timeout().await)
            .send()
            .await
            .map_err(|e| GatewayError::Service(format!("Failed to fetch events: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        let page: EventsResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unknown(format!("Failed to parse events response: {}", e)))?;

        Ok(page.items)
    }

    /// Create an event from the draft
    async fn insert_event(&self, draft: &EventDraft) -> GatewayResult<EventRecord> {
        let access_token = self.access_token().await?;
        let url = self.events_url(None).await?;

        debug!("Inserting event {:?}", draft.summary);

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .json(draft)
            .timeout(self.request_timeout().await)
            .send()
            .await
            .map_err(|e| GatewayError::Service(format!("Failed to insert event: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Unknown(format!("Failed to parse insert response: {}", e)))
    }

    /// Fetch one event by identifier
    async fn get_event(&self, event_id: &str) -> GatewayResult<EventRecord> {
        let access_token = self.access_token().await?;
        let url = self.events_url(Some(event_id)).await?;

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .timeout(self.request_timeout().await)
            .send()
            .await
            .map_err(|e| GatewayError::Service(format!("Failed to fetch event: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Unknown(format!("Failed to parse event response: {}", e)))
    }

    /// Replace an event's content wholesale
    async fn update_event(
        &self,
        event_id: &str,
        record: &EventRecord,
    ) -> GatewayResult<EventRecord> {
        let access_token = self.access_token().await?;
        let url = self.events_url(Some(event_id)).await?;

        debug!("Updating event {}", event_id);

        let response = self
            .client
            .put(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .json(record)
            .timeout(self.request_timeout().await)
            .send()
            .await
            .map_err(|e| GatewayError::Service(format!("Failed to update event: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Unknown(format!("Failed to parse update response: {}", e)))
    }

    /// Delete an event by identifier
    async fn delete_event(&self, event_id: &str) -> GatewayResult<()> {
        let access_token = self.access_token().await?;
        let url = self.events_url(Some(event_id)).await?;

        debug!("Deleting event {}", event_id);

        let response = self
            .client
            .delete(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .timeout(self.request_timeout().await)
            .send()
            .await
            .map_err(|e| GatewayError::Service(format!("Failed to delete event: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        Ok(())
    }
}
