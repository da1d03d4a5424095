use super::params::{CreateArgs, DeleteArgs, QueryArgs, UpdateArgs};
use super::{CREATE_TOOL, DELETE_TOOL, QUERY_TOOL, UPDATE_TOOL};
use crate::components::google_calendar::models::{EventDraft, EventTime};
use crate::components::google_calendar::{time, CalendarGateway, MAX_EVENTS_PER_QUERY};
use crate::components::identity_cache::IdentityCache;
use crate::config::Config;
use crate::error::{Error, GatewayError, RecoverableFault, ToolResult};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// The four calendar operations the model may invoke, composed over the
/// calendar gateway and the name→identifier cache.
pub struct CalendarTools {
    config: Arc<RwLock<Config>>,
    gateway: Arc<dyn CalendarGateway>,
    cache: Arc<dyn IdentityCache>,
}

impl CalendarTools {
    pub fn new(
        config: Arc<RwLock<Config>>,
        gateway: Arc<dyn CalendarGateway>,
        cache: Arc<dyn IdentityCache>,
    ) -> Self {
        Self {
            config,
            gateway,
            cache,
        }
    }

    /// Run the named tool against raw JSON arguments from the model.
    /// Every failure comes back as a recoverable fault for the agent
    /// loop to fold into the conversation.
    pub async fn dispatch(&self, name: &str, raw_args: &str) -> ToolResult<String> {
        debug!("Dispatching tool {} with arguments {}", name, raw_args);

        match name {
            QUERY_TOOL => {
                let args = parse_args::<QueryArgs>(raw_args)?;
                self.get_events_from_timeperiod(args).await
            }
            CREATE_TOOL => {
                let args = parse_args::<CreateArgs>(raw_args)?;
                self.create_event(args).await
            }
            DELETE_TOOL => {
                let args = parse_args::<DeleteArgs>(raw_args)?;
                self.delete_event(args).await
            }
            UPDATE_TOOL => {
                let args = parse_args::<UpdateArgs>(raw_args)?;
                self.update_event(args).await
            }
            _ => Err(RecoverableFault::new(format!(
                "There is no tool named {}.",
                name
            ))),
        }
    }

    /// List events in a window as a name → {startDate, endDate, location}
    /// mapping. An empty window is an empty mapping, not a fault.
    async fn get_events_from_timeperiod(&self, args: QueryArgs) -> ToolResult<String> {
        let mut records = self
            .gateway
            .list_events(&args.start_date_time, &args.end_date_time)
            .await
            .map_err(fault_from_gateway)?;

        // The contract caps and orders listings regardless of what the
        // gateway implementation already did
        time::sort_by_start(&mut records);
        records.truncate(MAX_EVENTS_PER_QUERY);

        let mut listing = serde_json::Map::new();
        for record in &records {
            // An event without a summary has no name to list it under
            let Some(name) = record.summary.clone() else {
                continue;
            };

            let entry = json!({
                "startDate": time::display_time(record.start.as_ref()),
                "endDate": time::display_time(record.end.as_ref()),
                "location": record.location.clone().unwrap_or_else(|| "N/A".to_string()),
            });
            listing.insert(name, entry);
        }

        Ok(Value::Object(listing).to_string())
    }

    /// Create an event and claim its name in the cache
    async fn create_event(&self, args: CreateArgs) -> ToolResult<String> {
        let summary = match args.summary {
            Some(summary) if !summary.trim().is_empty() => summary,
            _ => {
                return Err(RecoverableFault::new(
                    "The event needs a name. Ask the user what to call it and try again.",
                ))
            }
        };

        // Fail fast before touching the calendar
        if self.cache.exists(&summary).await.map_err(fault_from_cache)? {
            return Err(duplicate_name_fault(&summary));
        }

        let timezone = self.timezone().await;
        let draft = EventDraft {
            summary: Some(summary.clone()),
            location: args.location,
            description: args.description,
            start: EventTime::at(args.start_date_time, &timezone),
            end: EventTime::at(args.end_date_time, &timezone),
        };

        let record = self
            .gateway
            .insert_event(draft)
            .await
            .map_err(fault_from_gateway)?;

        // Claim the name. Losing the claim means another conversation
        // took it between the existence check and now; the freshly
        // created event would be unaddressable, so take it back down.
        let registered = self
            .cache
            .register(&summary, &record.id)
            .await
            .map_err(fault_from_cache)?;
        if !registered {
            let _ = self.gateway.delete_event(&record.id).await;
            return Err(duplicate_name_fault(&summary));
        }

        serde_json::to_string(&record).map_err(fault_from_serialization)
    }

    /// Delete an event by the name it was created under
    async fn delete_event(&self, args: DeleteArgs) -> ToolResult<String> {
        let name = args.event_name;

        let Some(event_id) = self.cache.get(&name).await.map_err(fault_from_cache)? else {
            return Err(unknown_name_fault(&name));
        };

        match self.gateway.delete_event(&event_id).await {
            Ok(()) => {}
            Err(GatewayError::NotFound) => {
                // The event vanished behind our back; drop the stale
                // mapping so the name can be reused
                self.cache.remove(&name).await.map_err(fault_from_cache)?;
                return Err(unknown_name_fault(&name));
            }
            Err(err) => return Err(fault_from_gateway(err)),
        }

        self.cache.remove(&name).await.map_err(fault_from_cache)?;
        Ok(format!("Deleted {}!", name))
    }

    /// Merge the supplied fields into an event, re-keying the mapping
    /// when the name changes
    async fn update_event(&self, args: UpdateArgs) -> ToolResult<String> {
        let name = args.event_name;

        let Some(event_id) = self.cache.get(&name).await.map_err(fault_from_cache)? else {
            return Err(unknown_name_fault(&name));
        };

        // A rename must land on a free name; check before any calendar
        // work so a duplicate costs nothing
        let rename = match &args.summary {
            Some(new_name) if *new_name != name => {
                if self.cache.exists(new_name).await.map_err(fault_from_cache)? {
                    return Err(duplicate_name_fault(new_name));
                }
                Some(new_name.clone())
            }
            _ => None,
        };

        let mut record = match self.gateway.get_event(&event_id).await {
            Ok(record) => record,
            Err(GatewayError::NotFound) => {
                self.cache.remove(&name).await.map_err(fault_from_cache)?;
                return Err(unknown_name_fault(&name));
            }
            Err(err) => return Err(fault_from_gateway(err)),
        };

        // Merge only what the caller supplied
        let timezone = self.timezone().await;
        if let Some(summary) = args.summary {
            record.summary = Some(summary);
        }
        if let Some(location) = args.location {
            record.location = Some(location);
        }
        if let Some(description) = args.description {
            record.description = Some(description);
        }
        if let Some(start) = args.start_date_time {
            record.start = Some(EventTime::at(Some(start), &timezone));
        }
        if let Some(end) = args.end_date_time {
            record.end = Some(EventTime::at(Some(end), &timezone));
        }

        let updated = match self.gateway.update_event(&event_id, record).await {
            Ok(updated) => updated,
            Err(GatewayError::NotFound) => {
                self.cache.remove(&name).await.map_err(fault_from_cache)?;
                return Err(unknown_name_fault(&name));
            }
            Err(err) => return Err(fault_from_gateway(err)),
        };

        // Re-key the mapping under the new name. A lost claim leaves
        // the old mapping in place so the event stays addressable.
        if let Some(new_name) = rename {
            let registered = self
                .cache
                .register(&new_name, &event_id)
                .await
                .map_err(fault_from_cache)?;
            if registered {
                self.cache.remove(&name).await.map_err(fault_from_cache)?;
            }
        }

        serde_json::to_string(&updated).map_err(fault_from_serialization)
    }

    async fn timezone(&self) -> String {
        let config_read = self.config.read().await;
        config_read.timezone.clone()
    }
}

/// Deserialize the model's raw arguments, downgrading garbage to a
/// recoverable fault instead of letting it escape
fn parse_args<T: DeserializeOwned>(raw_args: &str) -> ToolResult<T> {
    serde_json::from_str(raw_args)
        .map_err(|e| RecoverableFault::new(format!("The tool arguments were invalid: {}", e)))
}

fn duplicate_name_fault(name: &str) -> RecoverableFault {
    RecoverableFault::new(format!(
        "{} already exists in your events. Use another name!",
        name
    ))
}

fn unknown_name_fault(name: &str) -> RecoverableFault {
    RecoverableFault::new(format!("{} is not an entry in your calendar!", name))
}

fn fault_from_gateway(err: GatewayError) -> RecoverableFault {
    match err {
        GatewayError::NotFound => RecoverableFault::new(
            "It looks like that calendar entry no longer exists, would you like me to try again?",
        ),
        GatewayError::Service(message) => RecoverableFault::new(format!(
            "It looks like an {} has occurred, would you like me to try again?",
            message
        )),
        GatewayError::Unknown(_) => RecoverableFault::new(
            "It looks like an unexpected error has occurred, would you like me to try again?",
        ),
    }
}

fn fault_from_cache(err: Error) -> RecoverableFault {
    RecoverableFault::new(format!(
        "It looks like an {} has occurred, would you like me to try again?",
        err
    ))
}

fn fault_from_serialization(err: serde_json::Error) -> RecoverableFault {
    RecoverableFault::new(format!(
        "It looks like an {} has occurred, would you like me to try again?",
        err
    ))
}
