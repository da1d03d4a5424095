use miette::{Diagnostic, Result};
use std::fmt;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(sihteeri::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(sihteeri::config))]
    Config(String),

    #[error("Model provider error: {0}")]
    #[diagnostic(code(sihteeri::model_provider))]
    ModelProvider(String),

    #[error("Identity cache error: {0}")]
    #[diagnostic(code(sihteeri::identity_cache))]
    IdentityCache(String),

    #[error("Google Calendar error: {0}")]
    #[diagnostic(code(sihteeri::google_calendar))]
    GoogleCalendar(String),

    #[error(transparent)]
    #[diagnostic(code(sihteeri::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(sihteeri::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(sihteeri::other))]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Uniform fault shape for calendar service operations.
///
/// Every gateway call resolves to exactly one of these three variants so the
/// tool layer never has to inspect transport details.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum GatewayError {
    /// The event identifier no longer resolves on the service side.
    #[error("event not found in the calendar")]
    #[diagnostic(code(sihteeri::gateway::not_found))]
    NotFound,

    /// Any transport or service-level failure: HTTP non-success, rate
    /// limiting, expired auth, request timeout.
    #[error("calendar service error: {0}")]
    #[diagnostic(code(sihteeri::gateway::service))]
    Service(String),

    /// Anything that could not be classified, e.g. a response body that
    /// fails to decode.
    #[error("unexpected calendar failure: {0}")]
    #[diagnostic(code(sihteeri::gateway::unknown))]
    Unknown(String),
}

/// Type alias for Result with the gateway fault shape
pub type GatewayResult<T> = Result<T, GatewayError>;

/// A failure the agent can recover from by retrying the tool with corrected
/// arguments or by asking the user for clarification.
///
/// Carries a human-readable message and never terminates the process; the
/// agent loop is the only component that decides whether to retry or to
/// surface the message verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverableFault {
    message: String,
}

impl RecoverableFault {
    /// Create a new fault with the given user-facing message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The user-facing message describing the problem
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message folded back to the model when a retry is still in budget
    pub fn retry_prompt(&self) -> String {
        format!("{}\n\nFix the errors and try again.", self.message)
    }
}

impl fmt::Display for RecoverableFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RecoverableFault {}

/// Type alias for Result with a recoverable tool fault
pub type ToolResult<T> = Result<T, RecoverableFault>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create identity cache errors
pub fn identity_cache_error(message: &str) -> Error {
    Error::IdentityCache(message.to_string())
}

/// Helper to create model provider errors
pub fn model_provider_error(message: &str) -> Error {
    Error::ModelProvider(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create other errors
#[allow(dead_code)]
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
