//! End-to-end integration tests: real listener, real HTTP client,
//! full JSON-RPC request/response cycle through the running server.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::{Client, StatusCode, header};
use rpcgate_protocol::RpcError;
use rpcgate_server::{MethodRegistry, ParamSpec, RpcServer};
use rpcgate_transport::{BearerTokenCheck, CheckChain, CorsPolicy, TransportConfig, TransportServer};
use serde_json::{Value, json};

const JSON: &str = "application/json";

/// Values passed to `record`, in arrival order.
type Journal = Arc<Mutex<Vec<Value>>>;

fn test_registry(journal: Journal) -> MethodRegistry {
    MethodRegistry::builder()
        .method("add", [ParamSpec::required("a"), ParamSpec::required("b")], |_, p| {
            Ok(json!(p.required::<i64>("a")? + p.required::<i64>("b")?))
        })
        .method("record", [ParamSpec::required("value")], move |_, p| {
            journal.lock().push(p.required("value")?);
            Ok(Value::Null)
        })
        .method("caller", [], |ctx, _| {
            Ok(ctx.caller.map_or(Value::Null, |addr| json!(addr.as_bytes())))
        })
        .method(
            "fail",
            [ParamSpec::required("code"), ParamSpec::required("message")],
            |_, p| Err(RpcError::custom(p.required("code")?, p.required::<String>("message")?)),
        )
        .method("panic", [], |_, _| panic!("deliberate"))
        .build()
        .expect("valid registry")
}

struct TestServer {
    url: String,
    base: String,
    journal: Journal,
    transport: TransportServer,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(TransportConfig::default(), CheckChain::new()).await
    }

    /// Start on a random port; `config.port` and `config.hostname` are overridden.
    async fn start_with(config: TransportConfig, checks: CheckChain) -> Self {
        let journal = Journal::default();
        let server = Arc::new(RpcServer::new(test_registry(journal.clone())));

        let config = TransportConfig {
            port: 0,
            hostname: "127.0.0.1".into(),
            ..config
        };
        let path = config.path.clone();

        let transport = TransportServer::start_with_checks(config, server, checks)
            .await
            .expect("transport starts");
        let base = format!("http://127.0.0.1:{}", transport.port());

        Self {
            url: format!("{base}{path}"),
            base,
            journal,
            transport,
        }
    }

    /// POST a JSON body with JSON-RPC friendly headers.
    async fn post(&self, body: &Value) -> reqwest::Response {
        Client::new()
            .post(&self.url)
            .header(header::ACCEPT, JSON)
            .json(body)
            .send()
            .await
            .expect("request sent")
    }

    async fn rpc(&self, body: Value) -> (StatusCode, Value) {
        let response = self.post(&body).await;
        let status = response.status();
        let text = response.text().await.expect("body read");
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).expect("JSON body")
        };
        (status, value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / response cycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_over_http() {
    let server = TestServer::start().await;
    let response = server
        .post(&json!({"jsonrpc": "2.0", "method": "add", "params": [2, 3], "id": 1}))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json-rpc");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"jsonrpc": "2.0", "result": 5, "id": 1}));
}

#[tokio::test]
async fn invalid_envelope_gets_null_id() {
    let server = TestServer::start().await;
    let (status, body) = server.rpc(json!({"method": "add", "params": [1, 2], "id": 1})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"jsonrpc": "2.0", "error": {"code": -32600, "message": "Invalid Request"}, "id": null})
    );
}

#[tokio::test]
async fn unknown_method_over_http() {
    let server = TestServer::start().await;
    let (status, body) = server.rpc(json!({"jsonrpc": "2.0", "method": "missing", "id": "x"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["id"], "x");
}

#[tokio::test]
async fn notification_is_no_content() {
    let server = TestServer::start().await;
    let response = server
        .post(&json!({"jsonrpc": "2.0", "method": "record", "params": ["note"]}))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.bytes().await.unwrap().is_empty());
    assert_eq!(*server.journal.lock(), vec![json!("note")]);
}

#[tokio::test]
async fn batch_over_http() {
    let server = TestServer::start().await;
    let (status, body) = server
        .rpc(json!([
            {"jsonrpc": "2.0", "method": "add", "params": [1, 1], "id": 1},
            {"jsonrpc": "2.0", "method": "record", "params": [2]}
        ]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"jsonrpc": "2.0", "result": 2, "id": 1}]));
    assert_eq!(*server.journal.lock(), vec![json!(2)]);
}

#[tokio::test]
async fn batch_of_notifications_is_no_content() {
    let server = TestServer::start().await;
    let (status, _) = server
        .rpc(json!([
            {"jsonrpc": "2.0", "method": "record", "params": ["a"]},
            {"jsonrpc": "2.0", "method": "record", "params": ["b"]}
        ]))
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(*server.journal.lock(), vec![json!("a"), json!("b")]);
}

#[tokio::test]
async fn handler_failure_and_panic() {
    let server = TestServer::start().await;

    let (_, body) = server
        .rpc(json!({"jsonrpc": "2.0", "method": "fail", "params": {"code": 42, "message": "nope"}, "id": 1}))
        .await;
    assert_eq!(body["error"], json!({"code": 42, "message": "nope"}));

    let (status, body) = server.rpc(json!({"jsonrpc": "2.0", "method": "panic", "id": 2})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], json!({"code": -32000, "message": "Server error"}));

    // Still serving after a handler panic
    let (_, body) = server.rpc(json!({"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": 3})).await;
    assert_eq!(body["result"], 3);
}

#[tokio::test]
async fn caller_address_reaches_handler() {
    let server = TestServer::start().await;
    let (_, body) = server.rpc(json!({"jsonrpc": "2.0", "method": "caller", "id": 1})).await;
    assert_eq!(body["result"], json!([127, 0, 0, 1]));
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP gates
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_method_is_405() {
    let server = TestServer::start().await;
    let response = Client::new().get(&server.url).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "POST");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!({"code": 0, "message": "Only POST allowed"}));
}

#[tokio::test]
async fn options_is_preflight() {
    let server = TestServer::start().await;
    let response = Client::new()
        .request(reqwest::Method::OPTIONS, &server.url)
        .header(header::CONTENT_TYPE, "text/plain")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn content_type_and_accept_gates() {
    let server = TestServer::start().await;
    let body = r#"{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}"#;

    let plain = Client::new()
        .post(&server.url)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(plain.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let charset = Client::new()
        .post(&server.url)
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .header(header::ACCEPT, "application/json-rpc")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(charset.status(), StatusCode::OK);

    // reqwest's default `Accept: */*` is not a JSON-RPC media type
    let wildcard = Client::new()
        .post(&server.url)
        .header(header::CONTENT_TYPE, JSON)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(wildcard.status(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let server = TestServer::start().await;
    let response = Client::new()
        .post(&server.url)
        .header(header::CONTENT_TYPE, JSON)
        .header(header::ACCEPT, JSON)
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = TransportConfig {
        max_body_bytes: 64,
        ..TransportConfig::default()
    };
    let server = TestServer::start_with(config, CheckChain::new()).await;
    let response = server
        .post(&json!({"jsonrpc": "2.0", "method": "record", "params": ["x".repeat(256)], "id": 1}))
        .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(server.journal.lock().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration surface
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn custom_path_and_health() {
    let config = TransportConfig {
        path: "/rpc".into(),
        ..TransportConfig::default()
    };
    let server = TestServer::start_with(config, CheckChain::new()).await;

    let (status, body) = server.rpc(json!({"jsonrpc": "2.0", "method": "add", "params": [2, 2], "id": 1})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 4);

    let root = Client::new()
        .post(format!("{}/", server.base))
        .header(header::ACCEPT, JSON)
        .json(&json!({"jsonrpc": "2.0", "method": "add", "params": [2, 2], "id": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(root.status(), StatusCode::NOT_FOUND);

    let health: Value = Client::new()
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"status": "ok", "methods": 5}));
}

#[tokio::test]
async fn invalid_path_is_refused() {
    let journal = Journal::default();
    let server = Arc::new(RpcServer::new(test_registry(journal)));
    let config = TransportConfig {
        port: 0,
        path: "rpc".into(),
        ..TransportConfig::default()
    };

    assert!(TransportServer::start(config, server).await.is_err());
}

#[tokio::test]
async fn bearer_token_required() {
    let mut checks = CheckChain::new();
    checks.add(BearerTokenCheck::new("test-token"));
    let server = TestServer::start_with(TransportConfig::default(), checks).await;
    let body = json!({"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": 1});

    let (status, reply) = server.rpc(body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply["error"]["code"], -32010);

    let response = Client::new()
        .post(&server.url)
        .header(header::ACCEPT, JSON)
        .bearer_auth("test-token")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply: Value = response.json().await.unwrap();
    assert_eq!(reply["result"], 3);
}

#[tokio::test]
async fn cors_origin_is_reflected() {
    let config = TransportConfig {
        cors: CorsPolicy::from_origins(["http://app.example"]),
        ..TransportConfig::default()
    };
    let server = TestServer::start_with(config, CheckChain::new()).await;

    let response = Client::new()
        .post(&server.url)
        .header(header::ACCEPT, JSON)
        .header(header::ORIGIN, "http://app.example")
        .json(&json!({"jsonrpc": "2.0", "method": "record", "params": [1]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://app.example");
}

#[tokio::test]
async fn server_stops_cleanly() {
    let mut server = TestServer::start().await;
    server.transport.stop().await;

    let result = Client::new()
        .post(&server.url)
        .header(header::ACCEPT, JSON)
        .json(&json!({"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": 1}))
        .send()
        .await;
    assert!(result.is_err());
}
