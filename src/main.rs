mod agent;
mod components;
mod config;
mod error;
mod startup;
mod tools;

use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting sihteeri");

    // Load configuration
    let config = startup::load_config().await?;

    // Run the conversational loop
    startup::run_assistant(config).await
}
