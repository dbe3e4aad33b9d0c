//! HTTP surface: the rendered pages, the chart/card JSON API and the
//! dispatch endpoint for input changes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bindings::{Dispatcher, InputChange, Update};
use crate::config::AppConfig;
use crate::data::DataSources;
use crate::error::{DashboardError, Result};
use crate::models::{EventKey, Feature, Season};
use crate::pages::{self, PageRegistry};
use crate::views::{self, ChartSpec, DetailCard};

/// Dashboard HTTP server.
/// Every request reads the data files afresh; nothing here is mutable.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    registry: Arc<PageRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let sources = DataSources::new(&config.csv_path, &config.db_path);
        Self {
            config: Arc::new(config),
            registry: Arc::new(PageRegistry::default()),
            dispatcher: Arc::new(Dispatcher::with_default_bindings(sources)),
        }
    }
}

pub async fn run(config: AppConfig) -> Result<()> {
    let addr = config.addr;
    info!(
        csv = %config.csv_path.display(),
        db = %config.db_path.display(),
        debug = config.debug,
        "starting dashboard"
    );

    let app = router(AppState::new(config));

    info!("🚀 Server running on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let assets = ServeDir::new(state.config.data_dir.join("assets"));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/events", get(list_events))
        .route("/pages/:page", get(show_page))
        .route("/api/charts/line", get(line_chart))
        .route("/api/charts/gender", get(gender_charts))
        .route("/api/charts/geo", get(geo_chart))
        .route("/api/card", get(event_card))
        .route("/api/dispatch", post(dispatch))
        .route("/:name", get(greet))
        .nest_service("/assets", assets)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs a synchronous file or SQLite read on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Single-page dashboard
async fn root(State(state): State<AppState>) -> Result<Html<String>> {
    blocking(move || {
        pages::render_dashboard(&state.config, &state.registry, &state.dispatcher)
    })
    .await
    .map(Html)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn greet(Path(name): Path<String>) -> String {
    format!("Hello {name}!")
}

/// One line per event: `{year} {type} {start} {end}`
async fn list_events(State(state): State<AppState>) -> Result<String> {
    let events = blocking(move || state.dispatcher.sources().store.list_events()).await?;
    Ok(events
        .iter()
        .map(|event| format!("{event}\n"))
        .collect())
}

async fn show_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<Html<String>> {
    blocking(move || {
        pages::render_page(&state.config, &state.registry, &state.dispatcher, &page)
    })
    .await
    .map(Html)
}

#[derive(Debug, Deserialize)]
struct LineQuery {
    feature: Option<String>,
}

async fn line_chart(
    State(state): State<AppState>,
    Query(query): Query<LineQuery>,
) -> Result<Json<ChartSpec>> {
    let feature = match query.feature {
        Some(feature) => feature.parse::<Feature>()?,
        None => Feature::default(),
    };
    blocking(move || views::trend_chart(&state.dispatcher.sources().csv_path, feature))
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
struct GenderQuery {
    /// Comma separated, in display order
    season: Option<String>,
}

async fn gender_charts(
    State(state): State<AppState>,
    Query(query): Query<GenderQuery>,
) -> Result<Json<Vec<ChartSpec>>> {
    let seasons = query
        .season
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Season>)
        .collect::<Result<Vec<_>>>()?;

    blocking(move || {
        let csv_path = &state.dispatcher.sources().csv_path;
        seasons
            .into_iter()
            .map(|season| views::gender_chart(csv_path, season))
            .collect::<Result<Vec<_>>>()
    })
    .await
    .map(Json)
}

async fn geo_chart(State(state): State<AppState>) -> Result<Json<ChartSpec>> {
    blocking(move || views::geo_chart(&state.dispatcher.sources().store))
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
struct CardQuery {
    label: Option<String>,
    host: Option<String>,
    year: Option<i32>,
}

async fn event_card(
    State(state): State<AppState>,
    Query(query): Query<CardQuery>,
) -> Result<Json<DetailCard>> {
    let key = match (query.host, query.year, query.label) {
        (Some(host), Some(year), _) => EventKey::new(host, year),
        (_, _, Some(label)) => EventKey::from_label(&label)?,
        _ => return Err(DashboardError::InvalidLabel(String::new())),
    };
    blocking(move || views::create_card(&state.dispatcher.sources().store, &key))
        .await
        .map(Json)
}

/// Applies one input change; `204` when the bound output stays as it is.
async fn dispatch(
    State(state): State<AppState>,
    Json(change): Json<InputChange>,
) -> Result<Response> {
    let update: Option<Update> = blocking(move || state.dispatcher.respond(&change)).await?;
    Ok(match update {
        Some(update) => Json(update).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
