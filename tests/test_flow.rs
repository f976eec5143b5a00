//! End-to-end career day over HTTP: the web API in front, a local mock of the
//! chat-completion endpoint behind, streaming replies in between.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use career_sim::core::config::{OpenAiConfig, SimulationConfig, ThinkingBudget};
use career_sim::llm::providers::nvidia::NvidiaProvider;
use career_sim::llm::LlmProvider;
use career_sim::subsystems::comms::axum_channel;
use career_sim::subsystems::comms::CommsState;
use career_sim::subsystems::simulation::{Session, Simulator};

#[derive(Default)]
struct Seen {
    roles: Vec<String>,
    auth: Vec<Option<String>>,
    bodies: Vec<Value>,
}

fn role_of(system: &str) -> &'static str {
    if system.starts_with("You are a Career Research Agent") {
        "research"
    } else if system.starts_with("You are a Scenario Designer Agent") {
        "scenario"
    } else if system.starts_with("You are an Evaluation Agent") {
        "evaluator"
    } else if system.starts_with("You are a Narrator Agent") {
        "narrator"
    } else {
        "unknown"
    }
}

fn sse(reasoning: &str, content: &str) -> String {
    let (a, b) = content.split_at(content.len() / 2);
    let mut out = String::new();
    for delta in [
        json!({ "reasoning_content": reasoning }),
        json!({ "content": a }),
        json!({ "content": b }),
    ] {
        out.push_str(&format!("data: {}\n\n", json!({ "choices": [{ "delta": delta }] })));
    }
    out.push_str("data: [DONE]\n\n");
    out
}

/// Chat-completion mock that answers by agent role and counts calls per role.
async fn mock_llm() -> (String, Arc<Mutex<Seen>>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let seen_h = seen.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen_h.clone();
            async move {
                let system = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
                let role = role_of(&system);
                let mut s = seen.lock().unwrap();
                let n = s.roles.iter().filter(|r| r.as_str() == role).count() + 1;
                s.roles.push(role.to_string());
                s.auth.push(
                    headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                );
                s.bodies.push(body);
                drop(s);

                let content = match role {
                    "research" => json!({ "needs_research": false, "missing_info": [] }).to_string(),
                    "scenario" => format!("Scenario {n}: the walk-in fridge is warm."),
                    "evaluator" => format!(
                        "```json\n{}\n```",
                        json!({
                            "consequence": format!("Consequence {n}"),
                            "skills_used": ["food safety", format!("skill-{n}")],
                            "professional_insight": "Chefs check temperatures first."
                        })
                    ),
                    "narrator" => format!("Narration {n}"),
                    _ => "?".to_string(),
                };
                (
                    [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
                    sse(&format!("{role} thinking"), &content),
                )
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1/chat/completions"), seen)
}

fn provider(url: &str, key: Option<&str>) -> LlmProvider {
    let cfg = OpenAiConfig {
        api_base_url: url.to_string(),
        model: "nvidia/nvidia-nemotron-nano-9b-v2".into(),
        temperature: 0.7,
        top_p: 0.95,
        max_tokens: 1024,
        timeout_seconds: 10,
        stream: true,
        thinking: Some(ThinkingBudget { min_tokens: 256, max_tokens: 512 }),
    };
    LlmProvider::Nvidia(NvidiaProvider::new(&cfg, key.map(str::to_string)).unwrap())
}

fn simulation(max: u32) -> SimulationConfig {
    SimulationConfig {
        max_scenarios: max,
        time_slots: ["9:00 AM", "10:30 AM", "12:00 PM", "2:00 PM", "4:00 PM", "5:30 PM"]
            .map(String::from)
            .to_vec(),
        prompts_dir: PathBuf::from("config/prompts"),
        save_agent_log: false,
    }
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
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn stages_run_in_fixed_order() {
    let (url, seen) = mock_llm().await;
    let mut session = Session::new(Simulator::new(provider(&url, Some("env-key")), &simulation(5)));

    let opening = session.open("Chef").await.unwrap();
    assert_eq!(opening, "Narration 1");
    let reply = session.decide("Move the stock to the freezer").await.unwrap();
    assert_eq!(reply, "Narration 2");

    let log = session.simulator().agent_log();
    let agents: Vec<&str> = log.iter().map(|t| t.agent.as_str()).collect();
    assert_eq!(
        agents,
        ["Research", "Scenario Designer", "Narrator", "Evaluator", "Scenario Designer", "Narrator"]
    );
    assert_eq!(log[0].reasoning, "research thinking");
    assert_eq!(log[1].action, "Scenario 1: the walk-in fridge is warm.");

    let state = session.simulator().state();
    assert_eq!(state.time, "10:30 AM");
    assert_eq!(state.skills_demonstrated, vec!["food safety", "skill-1"]);

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.roles,
        ["research", "scenario", "narrator", "evaluator", "scenario", "narrator"]
    );
    assert!(seen.auth.iter().all(|a| a.as_deref() == Some("Bearer env-key")));
    let first = &seen.bodies[0];
    assert_eq!(first["stream"], true);
    assert_eq!(first["min_thinking_tokens"], 256);
    assert!(first["messages"][1]["content"]
        .as_str()
        .unwrap()
        .starts_with("Context: {\"career\":\"Chef\"}"));
}

#[tokio::test]
async fn web_api_plays_a_full_day() {
    let (url, seen) = mock_llm().await;
    let (tx, _rx) = mpsc::channel(16);
    let comms = Arc::new(CommsState::new(provider(&url, None), simulation(2), None, tx));
    let router = axum_channel::router("flow", comms, Duration::from_secs(10));

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/sessions",
        Some(json!({ "career": "Chef", "api_key": "session-key" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["opening"], "Narration 1");
    assert_eq!(body["session"]["state"]["time"], "9:00 AM");
    let id = body["session_id"].as_str().unwrap().to_string();

    for (i, choice) in ["Check the thermometer", "Call the repair service"].iter().enumerate() {
        let (status, body) = call(
            &router,
            Method::POST,
            &format!("/api/sessions/{id}/decision"),
            Some(json!({ "choice": choice })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["reply"], format!("Narration {}", i + 2));
        assert_eq!(body["state"]["scenarios_completed"], i + 1);
    }

    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/api/sessions/{id}/decision"),
        Some(json!({ "choice": "Go home early" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "day_complete");

    let (status, summary) = call(&router, Method::POST, &format!("/api/sessions/{id}/summary"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["career"], "Chef");
    assert_eq!(summary["scenarios_completed"], 2);
    assert_eq!(summary["skills"], json!(["food safety", "skill-1", "skill-2"]));
    assert_eq!(summary["agent_interactions"], 9);
    assert_eq!(summary["summary"], "Narration 4");

    let (_, view) = call(&router, Method::GET, &format!("/api/sessions/{id}"), None).await;
    let messages: Vec<(String, String)> = view["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| {
            (
                m["role"].as_str().unwrap().to_string(),
                m["content"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        messages,
        [
            ("assistant".to_string(), "Narration 1".to_string()),
            ("user".to_string(), "Check the thermometer".to_string()),
            ("assistant".to_string(), "Narration 2".to_string()),
            ("user".to_string(), "Call the repair service".to_string()),
            ("assistant".to_string(), "Narration 3".to_string()),
        ]
    );

    let seen = seen.lock().unwrap();
    // 3 opening + 2 × 3 decisions + 2 summary calls; the rejected decision never reached the model.
    assert_eq!(seen.roles.len(), 11);
    assert!(seen.auth.iter().all(|a| a.as_deref() == Some("Bearer session-key")));
}

#[tokio::test]
async fn unreachable_endpoint_is_bad_gateway() {
    // Bind then drop a listener to get a port nobody answers on.
    let addr = {
        let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let (tx, _rx) = mpsc::channel(16);
    let url = format!("http://{addr}/v1/chat/completions");
    let comms = Arc::new(CommsState::new(provider(&url, None), simulation(5), None, tx));
    let router = axum_channel::router("flow", comms.clone(), Duration::from_secs(10));

    let (status, body) = call(&router, Method::POST, "/api/sessions", Some(json!({ "career": "Chef" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "provider");
    assert_eq!(comms.session_count(), 0);
}
