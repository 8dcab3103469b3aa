use anyhow::{Context, Result};
use quill::api::{
    create_connect_router, create_connections_router, create_cron_router, create_posts_router,
    create_settings_router, ConnectAppState, CronAppState, DashboardAppState,
};
use quill::automation::ScheduledPublisher;
use quill::config::{load_config, QuillConfig};
use quill::credentials::{CredentialStore, ResourceType};
use quill::generation::LlmClient;
use quill::oauth::{run_state_cleanup, ExchangeClient, FacebookProvider, StateStore};
use quill::publish::{GraphPublisher, XPublisher};
use quill::store::DocumentStore;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "quill.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=info".into()),
        )
        .init();

    info!("Quill starting...");

    let mut config = read_config()?;
    config
        .apply_env_overrides()
        .context("Invalid environment configuration")?;

    info!(
        port = config.server.port,
        public_base_url = %config.server.public_base_url,
        database = %config.storage.database_path,
        "Configuration loaded"
    );

    if config.automation.owner().is_err() {
        warn!("QUILL_OWNER_USER_ID not set - cron jobs and the dashboard APIs will fail");
    }
    if config.automation.cron_secret.is_none() {
        warn!("QUILL_CRON_SECRET not set - every cron request will be rejected");
    }
    if config.api.token.is_none() {
        warn!("QUILL_API_TOKEN not set - dashboard APIs are unauthenticated (dev mode)");
    }

    let encryption_key = config
        .storage
        .encryption_key
        .clone()
        .context("QUILL_ENCRYPTION_KEY is required (base64-encoded 32-byte key)")?;

    let credential_store = Arc::new(
        CredentialStore::new(&config.storage.database_path, &encryption_key)
            .context("Failed to initialize credential store")?,
    );
    let documents = Arc::new(
        DocumentStore::new(&config.storage.database_path)
            .context("Failed to initialize document store")?,
    );
    info!("Stores initialized");

    let http_client = config.http.build_client()?;

    let exchange = match FacebookProvider::from_config(&config.facebook, &config.server.public_base_url) {
        Ok(provider) => {
            info!(redirect_uri = %provider.redirect_uri, "Facebook connect enabled");
            Some(ExchangeClient::new(provider, http_client.clone()))
        }
        Err(e) => {
            warn!(error = %e, "Facebook connect disabled");
            None
        }
    };

    let generator = Arc::new(
        LlmClient::from_config(&config.generation, http_client.clone())
            .context("Failed to initialize content generation client")?,
    );

    let publisher = ScheduledPublisher::new(
        config.automation.clone(),
        Arc::clone(&documents),
        Arc::clone(&credential_store),
        generator,
        documents.clone(),
    )
    .with_publisher(
        ResourceType::Facebook,
        Arc::new(GraphPublisher::new(&config.facebook, http_client.clone())),
    )
    .with_publisher(
        ResourceType::X,
        Arc::new(XPublisher::new(&config.x, http_client)),
    );

    // Purge abandoned connect attempts
    let state_store = StateStore::new(config.oauth.state_ttl_seconds);
    tokio::spawn(run_state_cleanup(
        state_store.clone(),
        config.oauth.cleanup_interval_seconds,
    ));

    let dashboard = DashboardAppState {
        documents: Arc::clone(&documents),
        credential_store: Arc::clone(&credential_store),
        automation: config.automation.clone(),
        api_token: config.api.token.clone(),
    };

    let app = create_connect_router(ConnectAppState {
        state_store,
        exchange,
        credential_store: Arc::clone(&credential_store),
        automation: config.automation.clone(),
        public_base_url: config.server.public_base_url.clone(),
    })
    .merge(create_cron_router(CronAppState {
        publisher: Arc::new(publisher),
        cron_secret: config.automation.cron_secret.clone(),
    }))
    .merge(create_settings_router(dashboard.clone()))
    .merge(create_connections_router(dashboard.clone()))
    .merge(create_posts_router(dashboard))
    .layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind HTTP port")?;
    info!(port = config.server.port, "Quill listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
            }
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    info!("Quill stopped");
    Ok(())
}

/// QUILL_CONFIG must exist if set; the default path is optional.
fn read_config() -> Result<QuillConfig> {
    match std::env::var("QUILL_CONFIG") {
        Ok(path) => load_config(&path).with_context(|| format!("Failed to load config from {}", path)),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_PATH)),
        Err(_) => Ok(QuillConfig::default()),
    }
}
