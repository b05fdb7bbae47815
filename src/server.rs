use crate::config::AppConfig;
use crate::data::Dataset;
use crate::types::PropertyRecord;
use anyhow::{Context, Result};
use axum::{extract::State, response::Json, routing::get, Router};
use geojson::FeatureCollection;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub regions: FeatureCollection,
    pub properties: Vec<PropertyRecord>,
}

/// `/chloropleth`, `/properties`, and static assets for everything else.
pub fn router(dataset: Dataset, static_dir: PathBuf) -> Router {
    let state = Arc::new(AppState {
        regions: dataset.regions,
        properties: dataset.properties,
    });

    Router::new()
        .route("/chloropleth", get(chloropleth_handler))
        .route("/properties", get(properties_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let app = router(dataset, config.input.static_dir.clone());

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn chloropleth_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(state.regions.clone())
}

async fn properties_handler(State(state): State<Arc<AppState>>) -> Json<Vec<PropertyRecord>> {
    Json(state.properties.clone())
}
