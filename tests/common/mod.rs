//! In-process mock backend shared by the integration tests

#![allow(dead_code)]

use axum::Router;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::net::TcpListener;

use duoreadme::TranslatorConfig;

/// Counts requests and keeps their JSON bodies
#[derive(Debug, Default)]
pub struct Recorder {
    hits: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
}

impl Recorder {
    pub fn record(&self, body: &Value) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body.clone());
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

/// Serve `router` on an ephemeral port and return its address
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// One SSE frame carrying a reply event
pub fn reply_frame(content: &str, is_final: bool, is_from_self: bool) -> String {
    let data = json!({
        "type": "reply",
        "payload": {
            "content": content,
            "is_final": is_final,
            "is_from_self": is_from_self,
        }
    });
    format!("event: reply\ndata: {data}\n\n")
}

/// Streaming backend configuration pointed at a mock server
pub fn tencent_config(addr: SocketAddr) -> TranslatorConfig {
    let mut config = TranslatorConfig {
        provider: "tencent".to_string(),
        ..Default::default()
    };
    config.app.bot_app_key = "test-bot-key".to_string();
    config.tencent_cloud.secret_id = "id".to_string();
    config.tencent_cloud.secret_key = "secret".to_string();
    config.sse.url = format!("http://{addr}/sse");
    config.sse.streaming_throttle = 0;
    config.sse.timeout = 5;
    config
}

/// Batch backend configuration pointed at a mock server
pub fn siliconflow_config(addr: SocketAddr) -> TranslatorConfig {
    let mut config = TranslatorConfig {
        provider: "siliconflow".to_string(),
        ..Default::default()
    };
    config.siliconflow.api_key = "sk-test".to_string();
    config.siliconflow.api_url = format!("http://{addr}/v1/chat/completions");
    config.siliconflow.timeout = 5;
    config
}
