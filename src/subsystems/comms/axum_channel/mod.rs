//! Axum-based web channel — serves the simulator page at `/` and a JSON API
//! under `/api/`.
//!
//! Implements [`Component`]: `run()` drives the axum event loop and the
//! shared [`CancellationToken`] is wired to axum's graceful shutdown.
//!
//! ## URL layout
//!
//! ```text
//! GET    /                                → single-page UI
//! GET    /favicon.ico                     → 204
//! GET    /api/health
//! POST   /api/sessions                    {career, api_key?}
//! GET    /api/sessions/{id}
//! POST   /api/sessions/{id}/decision      {choice}
//! POST   /api/sessions/{id}/summary
//! GET    /api/sessions/{id}/log
//! DELETE /api/sessions/{id}
//! ```

mod api;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::state::CommsState;
use crate::core::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
#[derive(Clone)]
pub(crate) struct AxumState {
    /// Channel identifier used in log spans.
    pub channel_id: Arc<str>,
    pub comms: Arc<CommsState>,
    /// Upper bound for one turn (open, decision or summary).
    pub turn_timeout: Duration,
}

// ── AxumChannel ───────────────────────────────────────────────────────────────

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    turn_timeout: Duration,
    state: Arc<CommsState>,
}

impl AxumChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        turn_timeout: Duration,
        state: Arc<CommsState>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            bind_addr: bind_addr.into(),
            turn_timeout,
            state,
        }
    }
}

impl Component for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_axum(*self, shutdown))
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

async fn run_axum(channel: AxumChannel, shutdown: CancellationToken) -> Result<(), AppError> {
    let AxumChannel { channel_id, bind_addr, turn_timeout, state } = channel;
    let router = build_router(AxumState {
        channel_id: Arc::from(channel_id.as_str()),
        comms: state,
        turn_timeout,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("axum bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "axum channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("axum server error: {e}")))?;

    info!(%channel_id, "axum channel shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the channel's router over `comms`.
pub fn router(channel_id: &str, comms: Arc<CommsState>, turn_timeout: Duration) -> Router {
    build_router(AxumState {
        channel_id: Arc::from(channel_id),
        comms,
        turn_timeout,
    })
}

fn build_router(state: AxumState) -> Router {
    Router::new()
        .route("/api/health",                         get(api::health))
        .route("/api/sessions",                       post(api::create_session))
        .route("/api/sessions/{session_id}",          get(api::session_view).delete(api::reset_session))
        .route("/api/sessions/{session_id}/decision", post(api::decision))
        .route("/api/sessions/{session_id}/summary",  post(api::summary))
        .route("/api/sessions/{session_id}/log",      get(api::agent_log))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .route("/",            get(ui::root))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::llm::providers::scripted::ScriptedProvider;
    use crate::llm::LlmProvider;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn app(script: &ScriptedProvider, max: u32) -> (Router, Arc<CommsState>) {
        app_with_timeout(script, max, Duration::from_secs(5))
    }

    fn app_with_timeout(script: &ScriptedProvider, max: u32, turn_timeout: Duration) -> (Router, Arc<CommsState>) {
        let (tx, _rx) = mpsc::channel(16);
        let sim = SimulationConfig {
            max_scenarios: max,
            time_slots: vec!["9:00 AM".into(), "10:30 AM".into()],
            prompts_dir: PathBuf::from("/nonexistent"),
            save_agent_log: false,
        };
        let comms = Arc::new(CommsState::new(LlmProvider::Scripted(script.clone()), sim, None, tx));
        (router("axum-test", comms.clone(), turn_timeout), comms)
    }

    /// Send a raw body with an optional content type; the reply must be JSON.
    async fn call_raw(router: &Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut req = Request::builder().method(Method::POST).uri(uri);
        if let Some(ct) = content_type {
            req = req.header("content-type", ct);
        }
        let resp = router
            .clone()
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| panic!("non-JSON body: {}", String::from_utf8_lossy(&bytes)));
        (status, value)
    }

    async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_provider() {
        let (router, _) = app(&ScriptedProvider::default(), 5);
        let (status, body) = call(&router, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], "scripted");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn root_serves_html() {
        let (router, _) = app(&ScriptedProvider::default(), 5);
        let resp = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Career Day Simulator"));
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let script = ScriptedProvider::new([
            "research", "S0", "OPENING",
            r#"{"skills_used":["timing"]}"#, "S1", "STORY",
            "EVAL", "SUMMARY",
        ]);
        let (router, comms) = app(&script, 1);

        let (status, body) = call(&router, Method::POST, "/api/sessions", Some(json!({ "career": "Chef" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["opening"], "OPENING");
        let id = body["session_id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &router,
            Method::POST,
            &format!("/api/sessions/{id}/decision"),
            Some(json!({ "choice": "cook" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "STORY");
        assert_eq!(body["state"]["time"], "10:30 AM");
        assert_eq!(body["complete"], true);

        let (status, body) = call(
            &router,
            Method::POST,
            &format!("/api/sessions/{id}/decision"),
            Some(json!({ "choice": "more" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "day_complete");

        let (status, body) = call(&router, Method::POST, &format!("/api/sessions/{id}/summary"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "SUMMARY");
        assert_eq!(body["skills"], json!(["timing"]));

        let (status, body) = call(&router, Method::GET, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["assistant", "user", "assistant"]);

        let (status, body) = call(&router, Method::GET, &format!("/api/sessions/{id}/log"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 6);

        let (status, _) = call(&router, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(comms.session_count(), 0);

        let (status, body) = call(&router, Method::GET, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn blank_inputs_are_bad_requests() {
        let script = ScriptedProvider::new(["r", "S0", "OPENING"]);
        let (router, _) = app(&script, 5);

        let (status, body) = call(&router, Method::POST, "/api/sessions", Some(json!({ "career": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");

        let (_, body) = call(&router, Method::POST, "/api/sessions", Some(json!({ "career": "Chef" }))).await;
        let id = body["session_id"].as_str().unwrap().to_string();
        let (status, _) = call(
            &router,
            Method::POST,
            &format!("/api/sessions/{id}/decision"),
            Some(json!({ "choice": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway() {
        let script = ScriptedProvider::default();
        script.push_error("HTTP 401: invalid key");
        let (router, comms) = app(&script, 5);
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/sessions",
            Some(json!({ "career": "Chef", "api_key": "nvapi-test" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "provider");
        assert!(body["message"].as_str().unwrap().contains("invalid key"));
        assert_eq!(comms.session_count(), 0);
    }

    #[tokio::test]
    async fn malformed_session_id_is_not_found() {
        let (router, _) = app(&ScriptedProvider::default(), 5);
        let (status, body) = call(&router, Method::GET, "/api/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn unreadable_bodies_are_json_bad_requests() {
        let script = ScriptedProvider::new(["r", "S0", "OPENING"]);
        let (router, comms) = app(&script, 5);
        let json_ct = Some("application/json");

        for (content_type, body) in [(json_ct, "{}"), (json_ct, "{not json"), (None, r#"{"career":"Chef"}"#)] {
            let (status, body) = call_raw(&router, "/api/sessions", content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "invalid_input");
            assert!(!body["message"].as_str().unwrap().is_empty());
        }
        assert_eq!(comms.session_count(), 0);
        assert_eq!(script.requests().len(), 0);

        let (_, body) = call(&router, Method::POST, "/api/sessions", Some(json!({ "career": "Chef" }))).await;
        let id = body["session_id"].as_str().unwrap().to_string();
        let (status, body) =
            call_raw(&router, &format!("/api/sessions/{id}/decision"), json_ct, r#"{"choise":"cook"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
        assert!(body["message"].as_str().unwrap().contains("choice"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_turn_is_gateway_timeout() {
        let script = ScriptedProvider::new(["r", "S0", "OPENING"]).with_delay(Duration::from_secs(60));
        let (router, comms) = app_with_timeout(&script, 5, Duration::from_secs(1));
        let (status, body) = call(&router, Method::POST, "/api/sessions", Some(json!({ "career": "Chef" }))).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "timeout");
        assert_eq!(comms.session_count(), 0);
    }
}
