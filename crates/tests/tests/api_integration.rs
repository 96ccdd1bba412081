use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use farm_api::{build_app, build_router, ApiState, AppConfig};
use farm_core::APOLOGY_REPLY;
use farm_ml::{FreshnessModel, Generator, HttpGeneratorConfig};
use farm_storage::{SeedData, Store};
use farm_tests::{
    ask, chat_request, multipart_body, predict_request, red_is_fresh_weights, solid_png,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn default_app() -> Router {
    build_app(AppConfig::default())
        .await
        .expect("app should build")
}

async fn app_with_model() -> Router {
    let store = Store::memory();
    store.seed(&SeedData::defaults()).await.unwrap();
    let model = FreshnessModel::from_weights(red_is_fresh_weights()).unwrap();
    build_router(ApiState::new(
        store,
        Generator::Unavailable,
        Some(model),
        &AppConfig::default(),
    ))
}

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

/// Serves a Responses-style endpoint on an ephemeral port.
async fn spawn_generator(reply: &'static str, delay: Duration) -> (String, Captured) {
    let captured = Captured::default();
    let sink = captured.clone();
    let app = Router::new().route(
        "/v1/responses",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.bodies.lock().push(body);
                if let Some(value) = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                {
                    sink.auth.lock().push(value.to_string());
                }
                tokio::time::sleep(delay).await;
                Json(json!({
                    "output": [
                        { "content": [ { "type": "output_text", "text": reply } ] }
                    ]
                }))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1/responses"), captured)
}

fn generator_config(endpoint: String, timeout: Duration) -> AppConfig {
    AppConfig {
        generator: Some(HttpGeneratorConfig {
            endpoint,
            model: "test-model".to_string(),
            api_key: Some("test-key".to_string()),
            max_output_tokens: 300,
        }),
        generator_timeout: timeout,
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn health_reports_store_and_capabilities() {
    let app = default_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["stats"]["transactions"], 4);
    assert_eq!(body["capabilities"]["generator"], false);
    assert!(body["timestamp_utc"].is_string());
}

#[tokio::test]
async fn chat_answers_crop_questions_from_the_store() {
    let app = default_app().await;

    let response = app
        .clone()
        .oneshot(ask("What season should I plant Tomato?"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "reply": "Tomato grows in Summer season." })
    );

    let response = app.oneshot(ask("who is the supplier for carrot")).await.unwrap();
    assert_eq!(
        json_body(response).await["reply"],
        "Supplier: FreshField Supply Co., Location: Vizag, Contact: 9988776655."
    );
}

#[tokio::test]
async fn chat_counts_transactions() {
    let app = default_app().await;

    for (question, expected) in [
        ("How many pending transactions?", "2 pending transactions."),
        ("completed transactions", "2 completed transactions."),
        ("show all transactions", "Total transactions: 4"),
    ] {
        let response = app.clone().oneshot(ask(question)).await.unwrap();
        assert_eq!(json_body(response).await["reply"], expected, "{question}");
    }
}

#[tokio::test]
async fn chat_answers_exact_faq() {
    let app = default_app().await;
    let response = app.oneshot(ask("What is crop rotation")).await.unwrap();
    assert_eq!(
        json_body(response).await["reply"],
        "Crop rotation improves soil health by changing crops each season."
    );
}

#[tokio::test]
async fn chat_rejects_malformed_payloads() {
    let cases: [(&str, &str); 9] = [
        ("{not json", "Invalid JSON input"),
        ("", "Send JSON like {\"question\":\"...\"}"),
        ("null", "Send JSON like {\"question\":\"...\"}"),
        ("{}", "Send JSON like {\"question\":\"...\"}"),
        ("0", "Send JSON like {\"question\":\"...\"}"),
        (r#"{"question": ""}"#, "Question cannot be empty"),
        (r#"{"question": "   "}"#, "Question cannot be empty"),
        (r#"{"question": 42}"#, "Question cannot be empty"),
        (r#"{"text": "tomato season"}"#, "Question cannot be empty"),
    ];

    let app = default_app().await;
    for (body, expected) in cases {
        let response = app.clone().oneshot(chat_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json_body(response).await, json!({ "reply": expected }), "{body}");
    }
}

#[tokio::test]
async fn chat_without_generator_apologizes_with_ok_status() {
    let app = default_app().await;
    let response = app.oneshot(ask("How do I keep pests away?")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["reply"], APOLOGY_REPLY);
}

#[tokio::test]
async fn chat_falls_back_to_remote_generator() {
    let (endpoint, captured) = spawn_generator("Use neem oil spray.", Duration::ZERO).await;
    let app = build_app(generator_config(endpoint, Duration::from_secs(5)))
        .await
        .unwrap();

    let response = app.oneshot(ask("How do I keep Pests away?")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["reply"], "Use neem oil spray.");

    let bodies = captured.bodies.lock().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["input"], "Answer in detail: How do I keep Pests away?");
    assert_eq!(bodies[0]["model"], "test-model");
    assert_eq!(bodies[0]["max_output_tokens"], 300);
    assert_eq!(captured.auth.lock().as_slice(), ["Bearer test-key"]);
}

#[tokio::test]
async fn structured_answers_skip_the_generator() {
    let (endpoint, captured) = spawn_generator("unused", Duration::ZERO).await;
    let app = build_app(generator_config(endpoint, Duration::from_secs(5)))
        .await
        .unwrap();

    let response = app.oneshot(ask("potato water needs")).await.unwrap();
    assert_eq!(json_body(response).await["reply"], "Potato needs Moderate water.");
    assert!(captured.bodies.lock().is_empty());
}

#[tokio::test]
async fn slow_generator_yields_apology() {
    let (endpoint, _captured) = spawn_generator("late", Duration::from_secs(3)).await;
    let app = build_app(generator_config(endpoint, Duration::from_millis(100)))
        .await
        .unwrap();

    let response = app.oneshot(ask("explain composting")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["reply"], APOLOGY_REPLY);
}

#[tokio::test]
async fn rate_limit_returns_429_but_spares_health() {
    let app = build_app(AppConfig {
        rate_limit_max: 2,
        ..AppConfig::default()
    })
    .await
    .unwrap();

    for _ in 0..2 {
        let response = app.clone().oneshot(ask("tomato season")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(ask("tomato season")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"], "rate_limited");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_is_per_peer_address() {
    let app = build_app(AppConfig {
        rate_limit_max: 1,
        ..AppConfig::default()
    })
    .await
    .unwrap();

    let from = |peer: &str| {
        let mut request = ask("tomato season");
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    };

    for peer in ["192.0.2.10:50001", "192.0.2.11:50002"] {
        let response = app.clone().oneshot(from(peer)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{peer}");
    }

    let response = app.oneshot(from("192.0.2.10:50003")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = build_app(AppConfig {
        max_upload_bytes: 64,
        ..AppConfig::default()
    })
    .await
    .unwrap();

    let question = "tomato ".repeat(40);
    let body = json!({ "question": question }).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn predict_requires_file_field() {
    let app = app_with_model().await;

    let response = app
        .clone()
        .oneshot(predict_request(multipart_body(
            "image",
            "tomato.png",
            &solid_png([200, 20, 20]),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "No file uploaded. Please upload with key 'file'."
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_rejects_empty_filename() {
    let app = app_with_model().await;
    let response = app
        .oneshot(predict_request(multipart_body(
            "file",
            "",
            &solid_png([200, 20, 20]),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Empty filename.");
}

#[tokio::test]
async fn predict_without_model_is_unavailable() {
    let app = default_app().await;
    let response = app
        .oneshot(predict_request(multipart_body(
            "file",
            "tomato.png",
            &solid_png([200, 20, 20]),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"], "freshness model is not loaded");
}

#[tokio::test]
async fn predict_rejects_undecodable_upload() {
    let app = app_with_model().await;
    let response = app
        .oneshot(predict_request(multipart_body(
            "file",
            "notes.txt",
            b"plain text, not pixels",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .starts_with("could not decode image"));
}

#[tokio::test]
async fn predict_scores_uploaded_image() {
    let app = app_with_model().await;

    let response = app
        .clone()
        .oneshot(predict_request(multipart_body(
            "file",
            "tomato.png",
            &solid_png([230, 25, 25]),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["predicted_class"], "freshtomato");
    assert_eq!(body["quality_label"], "Good Quality");
    assert!(body["confidence"].as_str().unwrap().ends_with('%'));
    assert!(body["fresh_percentage"].as_str().unwrap().ends_with('%'));
    assert!(body["rotten_percentage"].as_str().unwrap().ends_with('%'));

    let response = app
        .oneshot(predict_request(multipart_body(
            "file",
            "mold.png",
            &solid_png([30, 170, 30]),
        )))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["predicted_class"], "rottentomato");
    assert_eq!(body["quality_label"], "Bad Quality");
}
