// Pagebase Server - workspace API plus the built client

use axum::Router;
use std::path::Path;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pagebase::{app_state::AppState, config::Config, workspace_interface::create_workspace_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(
        "Starting with delete policy {} and {:?} field validation",
        config.workspace.delete_policy, config.workspace.field_validation
    );

    let app_state = AppState::new(config.clone()).await?;
    let api = create_workspace_router(app_state);

    let static_dir = Path::new(&config.server.static_dir);
    if !static_dir.exists() {
        warn!("Static directory {} not found; only the API will be served", static_dir.display());
    }
    // Client-side routes fall back to the SPA entry point
    let client = ServeDir::new(static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

    let app = Router::new()
        .nest("/api/v1", api)
        .fallback_service(client)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Pagebase listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
