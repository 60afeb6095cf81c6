//! HTTP layer exposing the precomputed DEI tables.

pub mod routes;
pub mod types;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    config::Settings,
    data::cache::TableCache,
    scoring::AggregateRow,
};

use self::types::ScoredRecord;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub aggregates: Arc<TableCache<AggregateRow>>,
    pub reviews: Arc<TableCache<ScoredRecord>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            aggregates: Arc::new(TableCache::new()),
            reviews: Arc::new(TableCache::new()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/aggregates", get(routes::list_aggregates))
        .route("/drugs/:drug/reviews", get(routes::drug_reviews))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings, host: String, port: u16) -> Result<()> {
    let router = router(AppState::new(settings));
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, "serving dei-explorer API");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
