//! HTTP bridge for a display layer.
//!
//! This module provides a read-only HTTP server that:
//! - Keeps the latest value of every controller event
//! - Serves it as one JSON document via GET /state
//! - Reports liveness via GET /health and session counters via GET /stats
//!
//! # Architecture
//!
//! ```text
//! DataController ──→ ControllerEvent ──→ ServerState ──→ GET /state ──→ dashboard
//! ```

use crate::controller::{ConnectivityStatus, ControllerEvent};
use crate::core::recommend::RecommendationCard;
use crate::core::report::{IndoorReport, OutdoorTrends};
use crate::core::trend::TrendResult;
use crate::feed::SensorSnapshot;
use crate::stats::{SharedSessionStats, StatsSnapshot};
use crate::weather::WeatherCacheEntry;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Latest value of every event kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardState {
    pub sensor: Option<SensorSnapshot>,
    pub indoor: Option<IndoorReport>,
    pub weather: Option<WeatherCacheEntry>,
    pub outdoor_trends: Option<OutdoorTrends>,
    pub connectivity: Option<ConnectivityStatus>,
    pub recommendations: Vec<RecommendationCard>,
    pub pressure_trend: Option<TrendResult>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    /// Replace the slot matching `event`.
    pub fn apply(&mut self, event: &ControllerEvent) {
        match event {
            ControllerEvent::SensorUpdate { snapshot, report } => {
                self.sensor = Some(snapshot.clone());
                self.indoor = Some(report.clone());
            }
            ControllerEvent::WeatherUpdate { entry, trends } => {
                self.weather = Some(entry.as_ref().clone());
                self.outdoor_trends = trends.clone();
            }
            ControllerEvent::Connectivity(status) => self.connectivity = Some(status.clone()),
            ControllerEvent::Recommendations(cards) => self.recommendations = cards.clone(),
            ControllerEvent::PressureTrend(result) => self.pressure_trend = Some(result.clone()),
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Shared server state
pub struct ServerState {
    dashboard: RwLock<DashboardState>,
    stats: Option<SharedSessionStats>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            dashboard: RwLock::new(DashboardState::default()),
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: SharedSessionStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Record an event for the next /state request.
    pub async fn apply(&self, event: &ControllerEvent) {
        self.dashboard.write().await.apply(event);
    }

    pub async fn dashboard(&self) -> DashboardState {
        self.dashboard.read().await.clone()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

async fn dashboard_state(State(state): State<Arc<ServerState>>) -> Json<DashboardState> {
    Json(state.dashboard().await)
}

async fn session_stats(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<StatsSnapshot>, (StatusCode, Json<ErrorResponse>)> {
    match &state.stats {
        Some(stats) => Ok(Json(stats.snapshot())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Session statistics are not attached".to_string(),
                code: "NO_STATS".to_string(),
            }),
        )),
    }
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    state: Arc<ServerState>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/state", get(dashboard_state))
        .route("/stats", get(session_stats))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Display bridge listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
