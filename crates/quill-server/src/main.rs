mod config;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use quill_api::auth::AppStateInner;
use quill_api::samples::SampleFetcher;
use quill_api::token::TokenService;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "quill=debug,quill_api=debug,quill_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_placeholder_secret() {
        warn!(
            "QUILL_JWT_SECRET is unset or a placeholder; tokens are forgeable. \
             Never run like this in production."
        );
    }

    // Init database
    let db = Arc::new(quill_db::Database::open(&config.db_path)?);

    let tokens = TokenService::new(&config.jwt_secret);
    let samples = SampleFetcher::new(config.sample_posts_url.clone())?;
    let state = AppStateInner::new(db, tokens, samples);

    let app = quill_api::routes::router(state, cors_layer(&config));

    info!("Quill listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
