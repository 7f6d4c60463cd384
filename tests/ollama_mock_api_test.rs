//! Ollama Mock API Tests
//!
//! These tests verify the HTTP interaction with an Ollama server using
//! wiremock: the ensure-model sequence, NDJSON streaming, embeddings and
//! failure classification.

use lcm::prelude::*;
use lcm::providers::ollama::OllamaProvider;
use serde_json::json;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

const NDJSON: &str = "application/x-ndjson";

fn config(server: &MockServer, model: &str) -> Config {
    Config {
        model: model.to_string(),
        provider: "ollama".to_string(),
        base_url: Some(server.uri()),
        timeout: Duration::from_secs(10),
        ..Config::default()
    }
}

fn tags(names: &[&str]) -> serde_json::Value {
    let models: Vec<_> = names
        .iter()
        .map(|name| json!({"name": name, "size": 4_683_087_332u64, "digest": "sha256:abc"}))
        .collect();
    json!({ "models": models })
}

async fn mount_tags(server: &MockServer, names: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tags(names)))
        .mount(server)
        .await;
}

async fn mount_chat_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "created_at": "2024-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": content},
            "done": true
        })))
        .mount(server)
        .await;
}

async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

/// Reserve a local port with nothing listening on it.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn test_chat_pulls_missing_model_before_inference() {
    let server = MockServer::start().await;
    mount_tags(&server, &["other:latest"]).await;
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .and(body_partial_json(json!({"name": "qwen2.5:7b"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"status\":\"pulling manifest\"}\n\
             {\"status\":\"downloading\",\"digest\":\"sha256:1\",\"total\":100,\"completed\":50}\n\
             {\"status\":\"success\"}\n",
            NDJSON,
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_chat_reply(&server, "Hi there").await;

    let model = Model::from_config(config(&server, "qwen2.5:7b"));
    let reply = model.chat("hello").await.unwrap();

    assert_eq!(reply, "Hi there");
    assert_eq!(
        request_paths(&server).await,
        vec!["/api/tags", "/api/pull", "/api/chat"]
    );
}

#[tokio::test]
async fn test_chat_skips_pull_when_untagged_name_matches() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3:latest"]).await;
    mount_chat_reply(&server, "ok").await;

    let model = Model::from_config(config(&server, "llama3"));
    assert_eq!(model.chat("ping").await.unwrap(), "ok");
    assert_eq!(request_paths(&server).await, vec!["/api/tags", "/api/chat"]);
}

#[tokio::test]
async fn test_every_call_rechecks_inventory() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3"]).await;
    mount_chat_reply(&server, "ok").await;

    let model = Model::from_config(config(&server, "llama3"));
    model.chat("one").await.unwrap();
    model.chat("two").await.unwrap();
    assert_eq!(
        request_paths(&server).await,
        vec!["/api/tags", "/api/chat", "/api/tags", "/api/chat"]
    );
}

#[tokio::test]
async fn test_stream_concatenation_matches_chat() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3"]).await;
    mount_chat_reply(&server, "Hello, world").await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hello\"},\"done\":false}\n\
             {\"message\":{\"role\":\"assistant\",\"content\":\", \"},\"done\":false}\n\
             not json at all\n\
             {\"message\":{\"role\":\"assistant\",\"content\":\"world\"},\"done\":false}\n\
             {\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n\
             {\"message\":{\"role\":\"assistant\",\"content\":\"late\"},\"done\":false}\n",
            NDJSON,
        ))
        .mount(&server)
        .await;

    let model = Model::from_config(config(&server, "llama3"));
    let fragments: Vec<String> = model
        .stream("greet")
        .await
        .unwrap()
        .map(|f| f.unwrap())
        .collect()
        .await;
    assert_eq!(fragments, vec!["Hello", ", ", "world"]);
    assert_eq!(fragments.concat(), model.chat("greet").await.unwrap());
}

#[tokio::test]
async fn test_generation_params_become_options() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3"]).await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "messages": [
                {"role": "system", "content": "be terse"},
                {"role": "user", "content": "hi"}
            ],
            "options": {"temperature": 0.1, "num_predict": 8, "mirostat": 2}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "yo"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = Model::from_config(config(&server, "llama3"));
    let params = GenerationParams::new()
        .with_temperature(0.1)
        .with_max_tokens(8)
        .with_extra("mirostat", 2);
    let conversation = vec![Message::system("be terse"), Message::user("hi")];
    assert_eq!(model.chat_with(conversation, &params).await.unwrap(), "yo");
}

#[tokio::test]
async fn test_embed_returns_vector() {
    let server = MockServer::start().await;
    mount_tags(&server, &["nomic-embed-text:latest"]).await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .and(body_partial_json(json!({"model": "nomic-embed-text", "prompt": "abc"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.25, -1.5, 3.0]})),
        )
        .mount(&server)
        .await;

    let model = Model::from_config(config(&server, "nomic-embed-text"));
    assert_eq!(model.embed("abc").await.unwrap(), vec![0.25, -1.5, 3.0]);
}

#[tokio::test]
async fn test_pull_error_line_aborts_call() {
    let server = MockServer::start().await;
    mount_tags(&server, &[]).await;
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"status\":\"pulling manifest\"}\n{\"error\":\"pull model manifest: file does not exist\"}\n",
            NDJSON,
        ))
        .mount(&server)
        .await;

    let model = Model::from_config(config(&server, "missing"));
    let err = model.chat("hi").await.unwrap_err();
    assert!(matches!(err, LlmError::ApiError { .. }));
    assert!(err.to_string().contains("file does not exist"));
    assert!(!request_paths(&server).await.contains(&"/api/chat".to_string()));
}

#[tokio::test]
async fn test_pull_without_success_is_an_error() {
    let server = MockServer::start().await;
    mount_tags(&server, &[]).await;
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("{\"status\":\"pulling manifest\"}\n", NDJSON),
        )
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&config(&server, "missing")).unwrap();
    let err = provider.pull_model().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Upstream);
}

#[tokio::test]
async fn test_http_error_status_propagates_generically() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3"]).await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let model = Model::from_config(config(&server, "llama3"));
    let err = model.chat("hi").await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert!(err.to_string().contains("model crashed"));
}

#[tokio::test]
async fn test_list_models_reports_inventory() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3:latest", "qwen2.5:7b"]).await;

    let provider = OllamaProvider::new(&config(&server, "qwen2.5")).unwrap();
    let names: Vec<_> = provider
        .list_models()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["llama3:latest", "qwen2.5:7b"]);
    assert!(provider.has_model().await);
}

#[tokio::test]
async fn test_unreachable_server_is_runtime_unavailable() {
    let model = Model::from_config(Config {
        base_url: Some(closed_port_url()),
        ..Config::default()
    });

    let err = model.chat("hi").await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unavailable);
    assert!(err.hint().unwrap().contains("ollama serve"));

    let err = model.stream("hi").await.err().unwrap();
    assert_eq!(err.category(), ErrorCategory::Unavailable);

    assert!(!model.health().await);
}

#[tokio::test]
async fn test_health_reflects_inventory() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3:8b"]).await;

    assert!(Model::from_config(config(&server, "llama3")).health().await);
    assert!(!Model::from_config(config(&server, "mistral")).health().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_entry_points_inside_runtime() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3"]).await;
    mount_chat_reply(&server, "blocking reply").await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"message\":{\"content\":\"blocking \"}}\n{\"message\":{\"content\":\"reply\"},\"done\":true}\n",
            NDJSON,
        ))
        .mount(&server)
        .await;

    let model = Model::from_config(config(&server, "llama3"));
    assert_eq!(model.chat_sync("hi").unwrap(), "blocking reply");
    assert_eq!(model.stream_sync("hi").collect_text().unwrap(), "blocking reply");
    assert!(model.health_sync());
}
