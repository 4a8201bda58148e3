use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use events_proxy::{
    apify::ApifyClient,
    config::Config,
    api::routes::create_router,
    events::EventsFetchService,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,events_proxy=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::load()?);
    let server_addr = config.server_addr;
    tracing::info!(actor_id = %config.actor_id, "Starting server on {}", server_addr);

    let runner = Arc::new(ApifyClient::new(&config)?);
    let app_state = AppState {
        events: Arc::new(EventsFetchService::new(config.clone(), runner)),
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;

    tracing::info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
