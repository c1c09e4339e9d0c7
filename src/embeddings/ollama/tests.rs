use super::*;

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        timeout_seconds: 5,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    assert_eq!(Embedder::model(&client), "test-model");
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);
    assert_eq!(client.retry_attempts, 5);

    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1, "at least one attempt is always made");
}

#[test]
fn empty_input_needs_no_server() {
    let config = OllamaConfig {
        host: "unreachable.invalid".to_string(),
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    let vectors = client.embed(&[]).expect("empty input should not hit the network");
    assert!(vectors.is_empty());
}

#[test]
fn model_listing_accepts_implicit_latest_tag() {
    let config = OllamaConfig {
        model: "all-minilm".to_string(),
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    let listed = vec![ModelInfo {
        name: "all-minilm:latest".to_string(),
        size: Some(45_000_000),
        digest: None,
    }];
    assert!(client.ensure_model_listed(&listed).is_ok());

    let other = vec![ModelInfo {
        name: "nomic-embed-text:latest".to_string(),
        size: None,
        digest: None,
    }];
    assert!(client.ensure_model_listed(&other).is_err());
}

#[test]
fn batch_request_serialization() {
    let inputs = vec!["first".to_string(), "second".to_string()];
    let request = BatchEmbedRequest {
        model: "all-minilm:latest",
        inputs: &inputs,
    };

    let json = serde_json::to_value(&request).expect("request should serialize");
    assert_eq!(json["model"], "all-minilm:latest");
    assert_eq!(json["input"][1], "second");
}
