//! FreshCart - multi-tenant grocery commerce API

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use freshcart::config::Config;
use freshcart::infrastructure::{db, events::EventPublisher};
use freshcart::services::sweeper;
use freshcart::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let pool = db::connect(&config.database_url).await.context("connecting to database")?;
    db::migrate(&pool).await.context("running migrations")?;
    tokio::fs::create_dir_all(&config.upload_dir).await.context("creating upload directory")?;

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let port = config.port;
    let state = AppState::new(pool, config, events);
    if state.gateway.is_none() {
        tracing::warn!("MIDTRANS_SERVER_KEY not set, gateway payments and notifications are disabled");
    }

    let _sweeper = sweeper::spawn(state.clone());
    let app = freshcart::api::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("FreshCart listening on 0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
