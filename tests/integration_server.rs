#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Full HTTP flow: router, service, real model clients and mock model servers

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use tutor_rag::config::{Config, GeminiConfig, OllamaConfig};
use tutor_rag::embeddings::OllamaClient;
use tutor_rag::generation::GeminiClient;
use tutor_rag::server::router;
use tutor_rag::service::RagService;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request as MockRequest, Respond, ResponseTemplate};

const BOUNDARY: &str = "integration-boundary";
const GENERATE_PATH: &str = "/v1beta/models/gemini-test:generateContent";

/// One 8-dimensional letter-frequency vector per input
struct EmbedResponder;

impl Respond for EmbedResponder {
    fn respond(&self, request: &MockRequest) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("request is JSON");
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .expect("input is an array")
            .iter()
            .map(|text| {
                let mut vector = vec![0.0_f32; 8];
                for byte in text.as_str().expect("string input").bytes() {
                    vector[usize::from(byte) % 8] += 1.0;
                }
                vector
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

struct Harness {
    router: Router,
    gemini: MockServer,
    _ollama: MockServer,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder)
        .mount(&ollama)
        .await;

    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Tutor answer"}]}}]
        })))
        .mount(&gemini)
        .await;

    let dir = TempDir::new().expect("should create TempDir");
    let ollama_uri = Url::parse(&ollama.uri()).expect("valid URI");
    let config = Config {
        ollama: OllamaConfig {
            host: ollama_uri.host_str().expect("host").to_string(),
            port: ollama_uri.port().expect("port"),
            ..OllamaConfig::default()
        },
        gemini: GeminiConfig {
            endpoint: gemini.uri(),
            model: "gemini-test".to_string(),
            timeout_seconds: 5,
            api_key: Some("test-key".to_string()),
        },
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    config.validate().expect("test config is valid");

    let embedder = OllamaClient::new(&config.ollama).expect("Ollama client");
    let api_key = config.require_api_key().expect("key set").to_string();
    let generator = GeminiClient::new(&config.gemini, api_key).expect("Gemini client");
    let service = RagService::new(config, Arc::new(embedder), Arc::new(generator));

    Harness {
        router: router(Arc::new(service)),
        gemini,
        _ollama: ollama,
        _dir: dir,
    }
}

async fn call(router: &Router, request: Request<Body>) -> Value {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&body).expect("JSON body")
}

fn chat(message: &str) -> Request<Body> {
    Request::post("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "message": message }).to_string()))
        .expect("valid request")
}

fn upload(field: &str, filename: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("valid request")
}

async fn prompts_sent(gemini: &MockServer) -> Vec<String> {
    gemini
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).expect("JSON request");
            body["contents"][0]["parts"][0]["text"]
                .as_str()
                .expect("prompt text")
                .to_string()
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_message_never_reaches_model() {
    let h = harness().await;

    let json = call(&h.router, chat("")).await;

    assert_eq!(json, json!({"ok": false, "answer": "Please type a question."}));
    assert!(prompts_sent(&h.gemini).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_before_any_upload() {
    let h = harness().await;

    let json = call(&h.router, chat("What is dynamic programming?")).await;

    assert_eq!(json, json!({"ok": true, "answer": "Tutor answer", "sources": []}));
    let prompts = prompts_sent(&h.gemini).await;
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("QUESTION:\nWhat is dynamic programming?"));
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_without_file_part() {
    let h = harness().await;

    let json = call(&h.router, upload("attachment", "notes.txt", "text")).await;

    assert_eq!(json, json!({"ok": false, "error": "No file part"}));
}

#[tokio::test(flavor = "multi_thread")]
async fn uploaded_document_grounds_answers() {
    let h = harness().await;
    let notes = "Dynamic programming stores the answers to overlapping subproblems.";

    let json = call(&h.router, upload("file", "dp.txt", notes)).await;
    assert_eq!(json, json!({"ok": true, "filename": "dp.txt"}));

    let json = call(&h.router, chat("What does dynamic programming store?")).await;
    assert_eq!(json["ok"], json!(true));
    assert_eq!(json["answer"], json!("Tutor answer"));
    assert_eq!(json["sources"], json!(["dp.txt#chunk0"]));

    let prompts = prompts_sent(&h.gemini).await;
    assert!(prompts[0].contains(notes));
}

#[tokio::test(flavor = "multi_thread")]
async fn model_failure_becomes_placeholder_answer() {
    let h = harness().await;
    h.gemini.reset().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&h.gemini)
        .await;

    let json = call(&h.router, chat("Explain memoization")).await;

    assert_eq!(json["ok"], json!(true));
    let answer = json["answer"].as_str().expect("answer text");
    assert!(answer.starts_with("Model error:"), "got {}", answer);
    assert_eq!(json["sources"], json!([]));
}
