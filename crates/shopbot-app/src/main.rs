mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use shopbot_api::AppState;
use shopbot_cart::{CartEngine, CartSettings, Catalog};
use shopbot_client::{AudioSequencer, ClientSession, HistoryReconciler, ReconcilerSettings};
use shopbot_core::{AgentProfile, ServerEvent, SessionProfile, ShopConfig};
use shopbot_dialog::{OpenAiModel, OpenAiSpeech};

use cli::{CliArgs, Command};

/// Slack added to the model timeout while waiting for a whole interaction.
const ASK_GRACE: Duration = Duration::from_secs(30);

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn load_catalog(path: Option<&str>) -> Result<Catalog, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => Catalog::load(Path::new(path))?,
        None => Catalog::bundled()?,
    };
    tracing::info!(products = catalog.len(), "Catalog loaded");
    Ok(catalog)
}

async fn serve(config: ShopConfig) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Arc::new(load_catalog(config.cart.catalog_path.as_deref())?);
    let cart = Arc::new(CartEngine::new(catalog, CartSettings::from(&config.cart)));

    if config.llm.api_key.trim().is_empty() {
        tracing::warn!("No LLM API key configured; model requests will fail");
    }
    let model = Arc::new(OpenAiModel::new(config.llm.clone())?);
    tracing::info!(model = %config.llm.model, url = %config.llm.api_url, "Language model ready");

    let mut state = AppState::new(config.clone(), cart, model);
    if let Some(speech_model) = &config.dialog.speech_model {
        let speech = OpenAiSpeech::new(&config.llm, speech_model.clone(), config.dialog.speech_voice.clone())?;
        tracing::info!(model = %speech_model, voice = %config.dialog.speech_voice, "Speech synthesis enabled");
        state = state.with_speech(Arc::new(speech));
    }

    shopbot_api::start_server(&config, state).await?;
    Ok(())
}

async fn ask(
    config: &ShopConfig,
    text: String,
    user_name: String,
    agent_name: String,
    server: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let base_url =
        server.unwrap_or_else(|| format!("http://{}:{}", config.general.host, config.general.port));
    let reconciler = HistoryReconciler::new(
        AudioSequencer::default(),
        ReconcilerSettings::from_config(&config.client),
    );
    let mut session = ClientSession::new(base_url, reconciler);
    let mut events = session.observe();

    let profile = SessionProfile {
        user_name,
        agent: AgentProfile {
            name: agent_name,
            ..Default::default()
        },
    };
    session.start(&profile).await?;
    session.send_text(text)?;

    let wait = Duration::from_secs(config.llm.timeout_secs) + ASK_GRACE;
    let finished = tokio::time::timeout(wait, async {
        while let Some(event) = events.recv().await {
            match event {
                ServerEvent::Text(event) if event.is_agent() && event.is_final() => {
                    println!("{}", event.text.text);
                }
                ServerEvent::ShoppingData(event) => match serde_json::to_string_pretty(&event.shopping_data) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::warn!("Failed to render shopping data: {}", e),
                },
                ServerEvent::Error(event) => eprintln!("error: {}", event.error),
                ServerEvent::InteractionEnd(_) => return true,
                _ => {}
            }
        }
        false
    })
    .await;

    match finished {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Event stream closed before the interaction ended"),
        Err(_) => tracing::warn!("Timed out after {:?} waiting for the interaction to end", wait),
    }

    session.close().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so its log level can take part.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match ShopConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (ShopConfig::default(), Some(e)),
    };

    init_tracing(&args.resolve_log_level(&config.general.log_level));
    tracing::info!("Starting ShopBot v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Failed to load config, using defaults")
        }
        Some(_) => tracing::info!(path = %config_file.display(), "No config file, using defaults"),
    }

    config.general.port = args.resolve_port(config.general.port);
    config.llm.api_key = args.resolve_api_key(&config.llm.api_key);

    match args.command() {
        Command::Serve => serve(config).await,
        Command::Ask {
            text,
            user_name,
            agent_name,
            server,
        } => ask(&config, text, user_name, agent_name, server).await,
    }
}
