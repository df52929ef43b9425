//! Portal Gate HTTP server.

use std::sync::Arc;

use portal_gate::adapters::http::{app, AppState};
use portal_gate::adapters::{
    PgProfileRepository, PostgrestProfileRepository, SupabaseAuthClient, SupabaseClient,
};
use portal_gate::config::{AppConfig, ProfileBackend, ServerConfig, ValidationError};
use portal_gate::ports::ProfileRepository;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server);

    let client = SupabaseClient::new(
        config.supabase.url.clone(),
        config.supabase.anon_key.clone(),
        config.supabase.request_timeout(),
    )?;

    let mut auth = SupabaseAuthClient::new(client.clone()).stateless();
    if let Some(url) = &config.supabase.signup_redirect_url {
        auth = auth.with_redirect_url(url.clone());
    }
    let auth = Arc::new(auth);

    let profiles: Arc<dyn ProfileRepository> = match config.profiles.backend {
        ProfileBackend::Rest => {
            let mut repo = PostgrestProfileRepository::new(client);
            if let Some(key) = &config.supabase.service_role_key {
                repo = repo.with_bearer(key.clone());
            }
            Arc::new(repo)
        }
        ProfileBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .ok_or(ValidationError::DatabaseRequiredForBackend)?;
            let pool = database.connect().await?;
            if database.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Database migrations applied");
            }
            Arc::new(PgProfileRepository::new(pool))
        }
    };

    let state = AppState {
        sessions: auth.clone(),
        validator: auth,
        profiles,
        features: config.features.clone(),
    };

    let addr = config.server.listen;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        backend = ?config.profiles.backend,
        "portal-gate listening"
    );

    axum::serve(listener, app(state, &config.server))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("portal-gate stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` overrides
/// the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_filter));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
