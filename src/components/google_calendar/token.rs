use crate::components::identity_cache::IdentityCacheHandle;
use crate::config::Config;
use crate::error::{google_calendar_error, AppResult};
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct TokenManager {
    config: Arc<RwLock<Config>>,
    client: Client,
    cache_handle: IdentityCacheHandle,
}

impl TokenManager {
    pub fn new(config: Arc<RwLock<Config>>, cache_handle: IdentityCacheHandle) -> Self {
        Self {
            config,
            client: Client::new(),
            cache_handle,
        }
    }

    /// Get an OAuth token, either the stored one or a fresh one obtained
    /// with the stored refresh token
    pub async fn get_token(&self) -> AppResult<Value> {
        let token = self.cache_handle.get_token().await?.ok_or_else(|| {
            google_calendar_error("No token found. Run the get_calendar_token binary first.")
        })?;

        // Check if token is expired
        if let Some(expiry) = token.get("expires_at").and_then(|v| v.as_i64()) {
            let now = Utc::now().timestamp();
            if expiry > now {
                return Ok(token);
            }
            // Token is expired, refresh it
            return self.refresh_token(&token).await;
        }

        Err(google_calendar_error(
            "Stored token has no expiry. Run the get_calendar_token binary again.",
        ))
    }

    /// Refresh an expired token
    async fn refresh_token(&self, token: &Value) -> AppResult<Value> {
        let refresh_token = token
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| google_calendar_error("No refresh token in token data"))?;

        let (client_id, client_secret) = {
            let config_read = self.config.read().await;
            (
                config_read.google_client_id.clone(),
                config_read.google_client_secret.clone(),
            )
        };

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token.to_string()),
            ("grant_type", "refresh_token".to_string()),
        ];

        let response = self
            .client
            .post("https://oauth2.googleapis.com/token")
            .form(&params)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let new_token: Value = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse token response: {}", e)))?;

        let access_token = new_token
            .get("access_token")
            .cloned()
            .ok_or_else(|| google_calendar_error("Token response missing 'access_token' field"))?;

        // Combine new access token with existing refresh token
        let mut token_data = serde_json::Map::new();
        token_data.insert("access_token".to_string(), access_token);
        token_data.insert("refresh_token".to_string(), json!(refresh_token));

        // Calculate expiry
        let expires_in = new_token
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .unwrap_or(3600);
        let expires_at = Utc::now().timestamp() + expires_in;
        token_data.insert("expires_at".to_string(), json!(expires_at));

        let token_json = json!(token_data);
        self.cache_handle.save_token(token_json.clone()).await?;

        Ok(token_json)
    }
}
