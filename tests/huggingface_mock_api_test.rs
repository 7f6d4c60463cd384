//! Hugging Face Mock API Tests
//!
//! Cloud mode against a wiremock inference endpoint, plus the hub metadata
//! lookup used by local-mode health checks.

use lcm::prelude::*;
use lcm::providers::huggingface::{HfCloudRuntime, HfLocalRuntime};
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

const MODEL_PATH: &str = "/models/org/tiny-chat";

fn cloud_config(server: &MockServer, token: Option<&str>) -> Config {
    Config {
        provider: "huggingface".to_string(),
        runtime: "cloud".to_string(),
        hf_model: Some("org/tiny-chat".to_string()),
        base_url: Some(server.uri()),
        hf_token: token.map(|t| SecretString::from(t.to_string())),
        timeout: Duration::from_secs(10),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_chat_sends_last_message_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("authorization", "Bearer hf_test"))
        .and(body_partial_json(json!({
            "inputs": "What is Rust?",
            "parameters": {"max_new_tokens": 32},
            "options": {"wait_for_model": true}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"generated_text": "A systems language."}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let model = Model::from_config(cloud_config(&server, Some("hf_test")));
    let conversation = vec![
        Message::system("You are helpful."),
        Message::user("What is Rust?"),
    ];
    let params = GenerationParams::new().with_max_tokens(32);
    let reply = model.chat_with(conversation, &params).await.unwrap();
    assert_eq!(reply, "A systems language.");
}

#[tokio::test]
async fn test_chat_without_token_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"generated_text": "hi"})))
        .mount(&server)
        .await;

    let model = Model::from_config(cloud_config(&server, None));
    assert_eq!(model.chat("hello").await.unwrap(), "hi");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_unauthorized_and_forbidden_are_authentication_errors() {
    for status in [401u16, 403] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"error": "Invalid token"})),
            )
            .mount(&server)
            .await;

        let model = Model::from_config(cloud_config(&server, Some("bad")));
        let err = model.chat("hi").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authentication, "status {status}");
        assert!(err.hint().unwrap().contains("HF_TOKEN"));

        let err = model.embed("hi").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authentication);

        let err = model.stream("hi").await.err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Authentication);
    }
}

#[tokio::test]
async fn test_other_error_status_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
        .mount(&server)
        .await;

    let model = Model::from_config(cloud_config(&server, None));
    let err = model.chat("hi").await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.category(), ErrorCategory::Upstream);
}

#[tokio::test]
async fn test_sse_stream_yields_token_text() {
    let server = MockServer::start().await;
    let body = "data: {\"token\":{\"id\":1,\"text\":\"Rust\",\"special\":false}}\n\n\
                : keep-alive\n\n\
                data: {\"token\":{\"id\":2,\"text\":\" is\",\"special\":false}}\n\n\
                data: {\"token\":{\"id\":3,\"text\":\" fast\",\"special\":false},\"generated_text\":null}\n\n\
                data: {\"token\":{\"id\":0,\"text\":\"</s>\",\"special\":true},\"generated_text\":\"Rust is fast\"}\n\n";
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(body_partial_json(json!({"parameters": {"stream": true}})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let model = Model::from_config(cloud_config(&server, None));
    let stream = model.stream("Describe Rust").await.unwrap();
    assert_eq!(collect_text(stream).await.unwrap(), "Rust is fast");
}

#[tokio::test]
async fn test_sse_error_payload_is_skipped() {
    let server = MockServer::start().await;
    let body = "data: {\"token\":{\"text\":\"partial\"}}\n\n\
                data: {\"error\":\"Input validation error\",\"error_type\":\"validation\"}\n\n";
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let model = Model::from_config(cloud_config(&server, None));
    let items: Vec<_> = model.stream("x").await.unwrap().collect().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap(), "partial");
}

#[tokio::test]
async fn test_cloud_stream_concatenates_to_chat_reply() {
    let server = MockServer::start().await;
    let events = "data: {\"token\":{\"id\":1,\"text\":\"Rust\",\"special\":false}}\n\n\
                  data: {\"token\":{\"id\":2,\"text\":\" is\",\"special\":false}}\n\n\
                  data: {\"token\":{\"id\":3,\"text\":\" fast\",\"special\":false}}\n\n\
                  data: {\"token\":{\"id\":0,\"text\":\"</s>\",\"special\":true},\"generated_text\":\"Rust is fast\"}\n\n";
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(body_partial_json(json!({"parameters": {"stream": true}})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(events, "text/event-stream"))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "Rust is fast"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let model = Model::from_config(cloud_config(&server, None));
    let reply = model.chat("Describe Rust").await.unwrap();
    let streamed = collect_text(model.stream("Describe Rust").await.unwrap())
        .await
        .unwrap();
    assert_eq!(streamed, reply);
    assert_eq!(reply, "Rust is fast");
}

#[tokio::test]
async fn test_embed_returns_raw_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(body_partial_json(json!({"inputs": "embed me"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.1, 0.2, 0.3])))
        .mount(&server)
        .await;

    let model = Model::from_config(cloud_config(&server, None));
    assert_eq!(model.embed("embed me").await.unwrap(), vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn test_cloud_health_is_false_only_for_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    let runtime = HfCloudRuntime::new(&cloud_config(&server, None)).unwrap();
    assert!(runtime.health().await);

    let missing = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&missing)
        .await;
    let runtime = HfCloudRuntime::new(&cloud_config(&missing, None)).unwrap();
    assert!(!runtime.health().await);
}

#[tokio::test]
async fn test_local_health_uses_hub_metadata() {
    let hub = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/models/org/tiny-chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "org/tiny-chat"})))
        .mount(&hub)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/models/org/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&hub)
        .await;

    let config = Config {
        provider: "huggingface".into(),
        runtime: "local".into(),
        hf_model: Some("org/tiny-chat".into()),
        ..Config::default()
    };
    let runtime = HfLocalRuntime::new(&config, None)
        .unwrap()
        .with_hub_url(hub.uri());
    assert!(runtime.health().await);

    let gone = Config {
        hf_model: Some("org/gone".into()),
        ..config
    };
    let runtime = HfLocalRuntime::new(&gone, None).unwrap().with_hub_url(hub.uri());
    assert!(!runtime.health().await);
}
