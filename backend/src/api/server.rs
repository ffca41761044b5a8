//! HTTP server for the dashboard API.
//!
//! Every dashboard request runs the full pipeline on the blocking pool;
//! requests share nothing but the configuration.
//!
//! # API Endpoints
//!
//! | Method | Path                 | Description                              |
//! |--------|----------------------|------------------------------------------|
//! | GET    | `/health`            | Health check                             |
//! | GET    | `/api/dashboard`     | Filtered views (`region`, `department`, `property_type`) |
//! | GET    | `/api/selectors`     | Selector choice lists                    |
//! | GET    | `/api/departments`   | Reference statistics, or lookup by `code` / `name` |
//! | GET    | `/api/regions`       | Region list                              |
//! | GET    | `/api/map`           | Choropleth values per department code    |
//! | GET    | `/api/map/geometry`  | Department boundaries (proxied)          |
//! | GET    | `/api/logs`          | SSE stream for pipeline logs             |

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_warning, LOG_BROADCASTER};
use super::types::{
    error_response, DashboardQuery, DepartmentLookup, DepartmentQuery, MapResponse, RegionsResponse,
};
use crate::catalog::{CatalogSummary, DepartmentCatalog};
use crate::config::DashboardConfig;
use crate::error::{PipelineResult, ServerError, ServerResult};
use crate::geo::{BoundaryClient, FEATURE_ID_KEY};
use crate::parser::load_departments;
use crate::transform::filter::SelectorOptions;
use crate::transform::pipeline::{render, selector_options, ViewBundle};

/// Shared, read-only server state.
struct AppState {
    config: DashboardConfig,
    boundaries: BoundaryClient,
}

type SharedState = Arc<AppState>;

/// Build the API router.
pub fn router(config: DashboardConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let state = Arc::new(AppState {
        boundaries: BoundaryClient::new(config.geojson_url.clone()),
        config,
    });

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route("/api/selectors", get(selectors))
        .route("/api/departments", get(departments))
        .route("/api/regions", get(regions))
        .route("/api/map", get(map))
        .route("/api/map/geometry", get(map_geometry))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    println!("🚀 Dashboard server running on http://localhost:{}", port);
    println!("   Departments:  {}", config.departments_path.display());
    println!("   Transactions: {}", config.transactions_path.display());
    println!("   GET /api/dashboard  - Filtered views");
    println!("   GET /api/selectors  - Selector choices");
    println!("   GET /api/departments, /api/regions - Reference data");
    println!("   GET /api/map        - Choropleth values");
    println!("   GET /api/logs       - SSE log stream");
    println!();

    let app = router(config);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run a pipeline call off the async executor.
async fn run_blocking<T, F>(job: F) -> ServerResult<T>
where
    F: FnOnce() -> PipelineResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "immo",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "dashboard": "GET /api/dashboard",
            "selectors": "GET /api/selectors",
            "departments": "GET /api/departments",
            "regions": "GET /api/regions",
            "map": "GET /api/map",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn dashboard(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
) -> ServerResult<Json<ViewBundle>> {
    let sources = state.config.sources();
    let selectors = query.selectors();
    let options = query.view_options(state.config.view_options());

    let bundle = run_blocking(move || render(&sources, &selectors, &options)).await?;
    Ok(Json(bundle))
}

async fn selectors(State(state): State<SharedState>) -> ServerResult<Json<SelectorOptions>> {
    let sources = state.config.sources();
    let options = run_blocking(move || selector_options(&sources)).await?;
    Ok(Json(options))
}

async fn departments(
    State(state): State<SharedState>,
    Query(query): Query<DepartmentQuery>,
) -> ServerResult<Json<Value>> {
    let path = state.config.departments_path.clone();
    let table = run_blocking(move || load_departments(&path)).await?;
    let catalog = DepartmentCatalog::new(&table.rows);

    let code = query.code.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let body = match (code, name) {
        (Some(_), Some(_)) => {
            return Err(ServerError::BadRequest("use either 'code' or 'name', not both".to_string()))
        }
        (Some(code), None) => to_json(&DepartmentLookup {
            query: code.to_string(),
            matches: catalog.find_by_code(code).into_iter().cloned().collect(),
        })?,
        (None, Some(name)) => to_json(&DepartmentLookup {
            query: name.to_string(),
            matches: catalog.find_by_name(name).into_iter().cloned().collect(),
        })?,
        (None, None) => to_json::<CatalogSummary>(&catalog.summary())?,
    };

    Ok(Json(body))
}

async fn regions(State(state): State<SharedState>) -> ServerResult<Json<RegionsResponse>> {
    let path = state.config.departments_path.clone();
    let table = run_blocking(move || load_departments(&path)).await?;
    let catalog = DepartmentCatalog::new(&table.rows);

    Ok(Json(RegionsResponse {
        total_regions: catalog.total_regions(),
        regions: catalog.regions(),
    }))
}

async fn map(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
) -> ServerResult<Json<MapResponse>> {
    let sources = state.config.sources();
    let selectors = query.selectors();
    let options = query.view_options(state.config.view_options());

    let bundle = run_blocking(move || render(&sources, &selectors, &options)).await?;
    Ok(Json(MapResponse {
        geojson_url: state.boundaries.url().to_string(),
        feature_id_key: FEATURE_ID_KEY.to_string(),
        points: bundle.choropleth,
    }))
}

/// Boundary proxy; a failure here leaves every other endpoint untouched.
async fn map_geometry(State(state): State<SharedState>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state.boundaries.fetch().await.map(Json).map_err(|e| {
        log_warning(format!("Map geometry unavailable: {}", e));
        (StatusCode::BAD_GATEWAY, Json(error_response(&e.to_string())))
    })
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> ServerResult<Value> {
    serde_json::to_value(value).map_err(|e| ServerError::Internal(e.to_string()))
}
