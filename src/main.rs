//! aigo - chat backend for learning English with an AI tutor
//!
//! Serves the REST API and the built frontend. Text generation goes to an
//! OpenAI-compatible endpoint, sign-in to a Supabase-compatible provider.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use aigo::auth::{IdentityProvider, SupabaseIdentity};
use aigo::config::Config;
use aigo::db::Database;
use aigo::llm::LlmClient;
use aigo::model::ModelHandle;
use aigo::paths;
use aigo::server::{self, RouterOptions};
use aigo::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aigo=info".parse()?),
        )
        .init();

    paths::log_paths();
    let config = Config::load().context("failed to load config")?;
    info!(addr = %config.listen_addr, "starting aigo");

    // Initialize database
    paths::ensure_db_dir(&config.db_path)?;
    info!("opening database at {}", config.db_path.display());
    let db = Database::open(&config.db_path).context("failed to open database")?;

    // Initialize LLM client
    let llm = LlmClient::new(ModelHandle::from_config(&config.llm))
        .context("failed to create LLM client")?;
    info!(model = %llm.model().name, remote = llm.model().is_remote(), "LLM client ready");

    // Identity provider
    if !config.identity.is_configured() {
        warn!("no identity provider configured, authenticated routes will fail");
    }
    let identity = SupabaseIdentity::from_config(&config.identity)?
        .map(|provider| Arc::new(provider) as Arc<dyn IdentityProvider>);

    let state = AppState::new(Arc::new(db), Arc::new(llm), identity, &config.limits);
    let options = RouterOptions {
        public_dir: config.public_dir.clone(),
        cors_origins: config.cors_origins.clone(),
        identity_url: config.identity.url.clone(),
    };

    server::serve(config.listen_addr, state, options).await
}
