// src/server/mod.rs

//! HTTP front end.
//!
//! Routing and request/response shaping only; the handlers delegate to
//! [`HistoryReader`] and [`CommandPublisher`] and translate their errors
//! into structured JSON payloads. Every response is HTTP 200 — errors are
//! carried in the body (`{"status":"error","message":...}`), matching what
//! the deployed dashboard already expects.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::{
    // ---
    Actuator,
    Channel,
    CommandPublisher,
    Error,
    HistoryReader,
    Result,
};

/// Shared handler state: the two request-path collaborators.
#[derive(Clone)]
pub struct AppState {
    pub history: HistoryReader,
    pub commands: CommandPublisher,
}

/// Build the bridge router.
///
/// CORS is permissive; the dashboard is served from another origin.
pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .route("/", get(root_handler))
        .route("/sensor_history", get(history_handler))
        .route("/control", post(control_handler))
        .route("/control_ai_mode", post(ai_mode_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router on the given address until the process exits.
pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    // ---
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("http: listening on {addr}");
    axum::serve(listener, router(state)).await
}

/// Translate a request-path error into its response payload.
///
/// Client mistakes and empty results get a human-readable message; store
/// and transport failures are logged server-side and reported generically.
fn error_payload(err: Error) -> Value {
    // ---
    let message = match &err {
        Error::InvalidDate(_) => "Invalid date format. Use YYYY-MM-DD.".to_string(),
        Error::InvalidChannel(_) => {
            "Invalid type. Use temp, humidity, lightIntensity, tempout, or humout.".to_string()
        }
        Error::InvalidTarget(_) => {
            "Invalid type. Use 'fanStatus', 'misterStatus', or 'lightStatus'.".to_string()
        }
        Error::NotFound => "No data found.".to_string(),
        other => {
            log::error!("http: request failed: {other}");
            "Internal error.".to_string()
        }
    };

    json!({"status": "error", "message": message})
}

async fn root_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Deserialize)]
struct HistoryParams {
    /// Sensor channel key; defaults to `temp`.
    #[serde(rename = "type")]
    channel: Option<String>,
    /// Optional `YYYY-MM-DD`; defaults to today.
    date: Option<String>,
}

/// GET /sensor_history — one day of logs plus bucket averages.
async fn history_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Json<Value> {
    // ---
    let result: Result<Value> = async {
        let channel = Channel::from_key(params.channel.as_deref().unwrap_or("temp"))?;
        let (data, logs) = state.history.query(channel, params.date.as_deref()).await?;

        Ok(json!({
            "status": "success",
            "data": data,
            "logs": logs,
        }))
    }
    .await;

    match result {
        Ok(body) => Json(body),
        Err(err) => Json(error_payload(err)),
    }
}

#[derive(Deserialize)]
struct ControlRequest {
    /// Actuator key: `fanStatus`, `misterStatus`, or `lightStatus`.
    #[serde(rename = "type")]
    target: String,
    status: bool,
}

/// POST /control — set an actuator's state.
async fn control_handler(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Json<Value> {
    // ---
    let result: Result<bool> = async {
        let actuator = Actuator::from_key(&req.target)?;
        state.commands.set_state(actuator, req.status).await
    }
    .await;

    match result {
        Ok(applied) => Json(json!({"status": "success", "state": applied})),
        Err(err) => Json(error_payload(err)),
    }
}

#[derive(Deserialize)]
struct ModeRequest {
    status: bool,
}

/// POST /control_ai_mode — toggle the AI-mode flag.
async fn ai_mode_handler(
    State(state): State<AppState>,
    Json(req): Json<ModeRequest>,
) -> Json<Value> {
    // ---
    match state.commands.set_ai_mode(req.status).await {
        Ok(applied) => Json(json!({"status": "success", "state": applied})),
        Err(err) => Json(error_payload(err)),
    }
}
