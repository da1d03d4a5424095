use crate::agent::{Agent, ModelProvider, OpenAiProvider};
use crate::components::google_calendar::GoogleCalendarHandle;
use crate::components::identity_cache::IdentityCacheActor;
use crate::config::Config;
use crate::error::Error;
use crate::tools::CalendarTools;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Wire up the actors and run the conversational loop until the user
/// leaves or the process is interrupted
pub async fn run_assistant(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    // Spawn the identity cache actor
    let (mut cache_actor, cache_handle) = IdentityCacheActor::new(Arc::clone(&config));
    tokio::spawn(async move {
        cache_actor.run().await;
    });

    // The calendar handle spawns its own actor
    let calendar_handle = GoogleCalendarHandle::new(Arc::clone(&config), cache_handle.clone());

    let tools = CalendarTools::new(
        Arc::clone(&config),
        Arc::new(calendar_handle.clone()),
        Arc::new(cache_handle.clone()),
    );
    let provider: Arc<dyn ModelProvider> = Arc::new(OpenAiProvider::new(Arc::clone(&config)));
    let agent = Agent::new(Arc::clone(&config), provider, tools);

    info!("Assistant ready");

    // Line-oriented loop on stdin; stdout carries only the conversation
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout
            .write_all(b"Enter the input here: ")
            .await
            .map_err(Error::from)?;
        stdout.flush().await.map_err(Error::from)?;

        let line = tokio::select! {
            line = lines.next_line() => line.map_err(Error::from)?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
        };

        // None means stdin closed
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit()" {
            break;
        }

        match agent.run(input).await {
            Ok(answer) => {
                stdout.write_all(answer.as_bytes()).await.map_err(Error::from)?;
                stdout.write_all(b"\n").await.map_err(Error::from)?;
            }
            Err(e) => {
                // A failed turn must not take the process down
                error!("Conversation turn failed: {:?}", e);
                stdout
                    .write_all(b"I'm sorry, something went wrong on my end. Please try again.\n")
                    .await
                    .map_err(Error::from)?;
            }
        }
    }

    // Wind the actors down before leaving
    let _ = calendar_handle.shutdown().await;
    let _ = cache_handle.shutdown().await;

    Ok(())
}
