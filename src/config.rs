use crate::error::{config_error, env_error, AppResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;

/// Default OpenAI model driving the agent
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default timezone label applied to created and updated event timestamps
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// Main configuration structure for the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenAI API key
    pub openai_api_key: String,
    /// OpenAI model name used for every conversation turn
    pub openai_model: String,
    /// Google Calendar API client ID
    pub google_client_id: String,
    /// Google Calendar API client secret
    pub google_client_secret: String,
    /// Google Calendar ID holding the user's events
    pub google_calendar_id: String,
    /// Redis connection URL for the identity cache
    pub redis_url: String,
    /// Timezone label stamped on event start/end times
    pub timezone: String,
    /// Upper bound in seconds for any single outbound HTTP request
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the environment
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let openai_api_key =
            env::var("OPENAI_API_KEY").map_err(|_| env_error("OPENAI_API_KEY"))?;
        let google_client_id =
            env::var("GOOGLE_CLIENT_ID").map_err(|_| env_error("GOOGLE_CLIENT_ID"))?;
        let google_client_secret =
            env::var("GOOGLE_CLIENT_SECRET").map_err(|_| env_error("GOOGLE_CLIENT_SECRET"))?;
        let google_calendar_id =
            env::var("GOOGLE_CALENDAR_ID").map_err(|_| env_error("GOOGLE_CALENDAR_ID"))?;

        // Optional variables with defaults
        let openai_model =
            env::var("OPENAI_MODEL").unwrap_or_else(|_| String::from(DEFAULT_MODEL));
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| String::from("redis://127.0.0.1:6379"));
        let timezone = env::var("TIMEZONE").unwrap_or_else(|_| String::from(DEFAULT_TIMEZONE));

        let request_timeout_secs = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .map_err(|_| config_error("Invalid REQUEST_TIMEOUT_SECS format"))?,
            Err(_) => 30,
        };

        // The timezone label travels verbatim to Google, so reject anything
        // that is not a known IANA name up front
        timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone: {}", timezone)))?;

        Ok(Config {
            openai_api_key,
            openai_model,
            google_client_id,
            google_client_secret,
            google_calendar_id,
            redis_url,
            timezone,
            request_timeout_secs,
        })
    }

    /// Parsed form of the timezone label
    pub fn timezone_tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::Tz::UTC)
    }
}
