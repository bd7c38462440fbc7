//! maitre application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Build the reservation gateway, the model client and the turn executor
//! 4. Start the axum chat server

mod cli;

use std::sync::Arc;

use clap::Parser;

use maitre_api::{start_server, AppState};
use maitre_booking::{BookingService, HttpReservationClient};
use maitre_chat::{
    ChatOrchestrator, InMemorySessionStore, LanguageModel, LlmIntentExtractor, OllamaClient,
    TurnExecutor,
};
use maitre_core::config::MaitreConfig;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so the file's log level applies;
    // the outcome is logged once the subscriber is up.
    let config_file = args.resolve_config_path();
    let loaded = MaitreConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => MaitreConfig::default(),
    };
    args.apply(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    tracing::info!("Starting maitre v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }
    if config.booking.bearer_token.is_empty() {
        tracing::warn!("No booking API token configured; set MAITRE_BOOKING_TOKEN");
    }

    // Reservation side.
    let gateway = HttpReservationClient::new(config.booking.clone())?;
    let booking = BookingService::new(Arc::new(gateway));
    tracing::info!(
        base_url = %config.booking.base_url,
        restaurant = %config.booking.restaurant_name,
        "Reservation gateway ready"
    );

    // Model side.
    let ollama = OllamaClient::new(&config.llm)?;
    if ollama.check_health().await {
        tracing::info!(model = %ollama.model(), "Language model ready");
    } else {
        tracing::warn!(
            base_url = %config.llm.base_url,
            model = %ollama.model(),
            "Ollama is not reachable yet"
        );
    }
    let llm: Arc<dyn LanguageModel> = Arc::new(ollama);
    let restaurant = config.booking.restaurant_name.as_str();
    let extractor = Arc::new(LlmIntentExtractor::new(Arc::clone(&llm), restaurant));

    let executor = TurnExecutor::new(extractor, Arc::clone(&llm), booking, restaurant);
    let orchestrator = ChatOrchestrator::new(
        executor,
        Arc::new(InMemorySessionStore::new()),
        config.chat.max_message_length,
    );

    let state = AppState::new(orchestrator, llm);
    start_server(&config.server, state).await?;

    Ok(())
}
