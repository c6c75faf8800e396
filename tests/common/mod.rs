#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wabridge::{app, AppConfig, AppState, ModelConfig, WhatsAppConfig};

pub const PHONE_ID: &str = "PHONE123";
pub const VERIFY: &str = "hub-secret";

/// Tracks environment variable mutations and restores originals on drop.
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.capture(key);
        std::env::set_var(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.capture(key);
        std::env::remove_var(key);
    }

    fn capture(&mut self, key: &str) {
        self.originals
            .entry(key.to_string())
            .or_insert_with(|| std::env::var(key).ok());
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// One request seen by a mock upstream.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    /// Text bodies of recorded Graph API sends, in order.
    pub fn texts(&self) -> Vec<String> {
        self.all()
            .iter()
            .filter_map(|r| r.body.pointer("/text/body").and_then(Value::as_str))
            .map(str::to_owned)
            .collect()
    }

    fn push(&self, path: String, headers: &HeaderMap, body: Value) {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.0.lock().unwrap().push(Recorded {
            path,
            authorization,
            body,
        });
    }
}

#[derive(Clone)]
struct MockState {
    recorder: Recorder,
    status: StatusCode,
    reply: Value,
}

async fn serve(router: Router) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

/// Mock Graph API answering every send with `status`. Returns the API base
/// (including the version segment) and the recorder.
pub async fn start_mock_graph(status: StatusCode) -> (String, Recorder) {
    async fn send(
        State(st): State<MockState>,
        Path(phone): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        st.recorder
            .push(format!("/v20.0/{}/messages", phone), &headers, body);
        (st.status, Json(st.reply.clone()))
    }
    let recorder = Recorder::default();
    let reply = if status.is_success() {
        json!({"messaging_product": "whatsapp", "messages": [{"id": "wamid.OUT"}]})
    } else {
        json!({"error": {"message": "Invalid parameter", "code": 100}})
    };
    let router = Router::new()
        .route("/v20.0/:phone/messages", post(send))
        .with_state(MockState {
            recorder: recorder.clone(),
            status,
            reply,
        });
    let (base, _handle) = serve(router).await;
    (format!("{}/v20.0", base), recorder)
}

/// Mock chat completion API returning `reply` with `status`.
pub async fn start_mock_model(status: StatusCode, reply: Value) -> (String, Recorder) {
    async fn complete(
        State(st): State<MockState>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        st.recorder
            .push("/v1/chat/completions".to_string(), &headers, body);
        (st.status, Json(st.reply.clone()))
    }
    let recorder = Recorder::default();
    let router = Router::new()
        .route("/v1/chat/completions", post(complete))
        .with_state(MockState {
            recorder: recorder.clone(),
            status,
            reply,
        });
    let (base, _handle) = serve(router).await;
    (format!("{}/v1", base), recorder)
}

pub fn completion_reply(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

pub fn test_config(graph_base: &str, model_base: &str) -> AppConfig {
    let defaults = AppConfig::default();
    AppConfig {
        verify_token: Some(VERIFY.to_string()),
        whatsapp: WhatsAppConfig {
            api_base: graph_base.to_string(),
            phone_number_id: Some(PHONE_ID.to_string()),
            access_token: Some("wa-token".to_string()),
        },
        model: ModelConfig {
            api_base: model_base.to_string(),
            api_key: Some("xai-key".to_string()),
            ..defaults.model
        },
        outbound_timeout_ms: 2_000,
        ..defaults
    }
}

pub async fn spawn_app(state: AppState) -> (String, JoinHandle<()>) {
    serve(app(state)).await
}

/// A WhatsApp Cloud API delivery carrying `messages`.
pub fn webhook_with(messages: Value) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA_ID",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": { "phone_number_id": PHONE_ID },
                    "contacts": [{ "wa_id": "15551234567" }],
                    "messages": messages
                }
            }]
        }]
    })
}

pub fn text_webhook(body: &str) -> Value {
    webhook_with(json!([{
        "from": "15551234567",
        "id": "wamid.IN",
        "timestamp": "1700000000",
        "type": "text",
        "text": { "body": body }
    }]))
}
