// Shiftbook API server
// Decision: Configuration comes from the environment (.env honoured for local development)
// Decision: Missing identity provider config is not fatal; guarded routes answer 503 instead

use anyhow::{Context, Result};
use shiftbook_api::{api, auth};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shiftbook_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("shiftbook-api starting...");
    if let Some(path) = dotenv_path {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    // Load authentication configuration
    let auth_config = auth::AuthConfig::from_env();
    if auth_config.is_provider_configured() {
        tracing::info!("Identity provider configured");
    } else {
        tracing::warn!(
            "SUPABASE_URL / SUPABASE_ANON_KEY not set; protected routes will return 503"
        );
    }

    let cors = api::cors_layer(&auth_config.frontend_origin);
    let auth_state = auth::AuthState::new(auth_config);

    let app = api::router(auth_state).context("Failed to build router")?;

    // Add CORS layer only if the front-end origin is usable
    let app = match cors {
        Some(cors) => app.layer(cors),
        None => app,
    };

    // Add tracing
    let app = app.layer(TraceLayer::new_for_http());

    // Start HTTP server
    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
