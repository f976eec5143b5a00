//! Axum handlers for `/api/*` routes.
//!
//! Every turn-running handler is bounded by the channel's turn timeout.
//! Errors are returned as `{"error": <code>, "message": <text>}`, including
//! request bodies axum's `Json` extractor refuses.

use std::future::Future;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use super::AxumState;
use crate::subsystems::comms::state::{OpenOptions, SessionError};
use crate::subsystems::simulation::SimError;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct CreateSessionRequest {
    career: String,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct DecisionRequest {
    choice: String,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn error_response(state: &AxumState, err: SessionError) -> Response {
    let (status, code) = match &err {
        SessionError::UnknownSession(_) => (StatusCode::NOT_FOUND, "not_found"),
        SessionError::Sim(SimError::EmptyInput(_)) => (StatusCode::BAD_REQUEST, "invalid_input"),
        SessionError::Sim(SimError::DayComplete(_)) => (StatusCode::CONFLICT, "day_complete"),
        SessionError::Sim(SimError::NotStarted | SimError::AlreadyStarted) => {
            (StatusCode::CONFLICT, "invalid_state")
        }
        SessionError::Sim(SimError::Provider(_)) => {
            warn!(channel_id = %state.channel_id, "provider failure: {err}");
            (StatusCode::BAD_GATEWAY, "provider")
        }
    };
    (status, json_error(code, err)).into_response()
}

/// Unwrap a JSON body, turning extractor rejections into 400 `invalid_input`.
fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(v)| v).map_err(|rejection| {
        (StatusCode::BAD_REQUEST, json_error("invalid_input", rejection.body_text())).into_response()
    })
}

fn parse_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw)
        .map_err(|_| (StatusCode::NOT_FOUND, json_error("not_found", format!("unknown session: {raw}"))).into_response())
}

/// Run `fut` under the turn timeout, mapping errors to responses.
async fn bounded<T>(
    state: &AxumState,
    what: &str,
    fut: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, Response> {
    match tokio::time::timeout(state.turn_timeout, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(error_response(state, e)),
        Err(_) => {
            warn!(channel_id = %state.channel_id, "{what} timed out");
            Err((StatusCode::GATEWAY_TIMEOUT, json_error("timeout", format!("{what} timed out"))).into_response())
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    let body = json!({
        "status": "ok",
        "provider": state.comms.provider_name(),
        "sessions": state.comms.session_count(),
        "max_scenarios": state.comms.max_scenarios(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /api/sessions
pub(super) async fn create_session(
    State(state): State<AxumState>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Response {
    let req = match payload(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let opts = OpenOptions {
        api_key: req.api_key,
        progress: None,
    };
    match bounded(&state, "session start", state.comms.open(&state.channel_id, &req.career, opts)).await {
        Ok(opened) => {
            let body = json!({
                "session_id": opened.session_id,
                "opening": opened.opening,
                "session": opened.view,
            });
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(resp) => resp,
    }
}

/// GET /api/sessions/{session_id}
pub(super) async fn session_view(State(state): State<AxumState>, Path(session_id): Path<String>) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match bounded(&state, "session view", state.comms.view(id)).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(resp) => resp,
    }
}

/// POST /api/sessions/{session_id}/decision
pub(super) async fn decision(
    State(state): State<AxumState>,
    Path(session_id): Path<String>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let req = match payload(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    match bounded(&state, "decision", state.comms.decide(id, &req.choice)).await {
        Ok((reply, view)) => {
            let body = json!({
                "reply": reply,
                "state": view.state,
                "complete": view.complete,
                "session": view,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(resp) => resp,
    }
}

/// POST /api/sessions/{session_id}/summary
pub(super) async fn summary(State(state): State<AxumState>, Path(session_id): Path<String>) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match bounded(&state, "summary", state.comms.summarize(id)).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(resp) => resp,
    }
}

/// GET /api/sessions/{session_id}/log
pub(super) async fn agent_log(State(state): State<AxumState>, Path(session_id): Path<String>) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match bounded(&state, "agent log", state.comms.agent_log(id)).await {
        Ok(log) => (StatusCode::OK, Json(log)).into_response(),
        Err(resp) => resp,
    }
}

/// DELETE /api/sessions/{session_id}
pub(super) async fn reset_session(State(state): State<AxumState>, Path(session_id): Path<String>) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.comms.reset(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&state, e),
    }
}
