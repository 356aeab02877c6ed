//! In-process stand-in for a VTube Studio instance.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message};
use vts_client::{ClientConfig, LatencyConfig};

pub const ISSUED_TOKEN: &str = "issued-token";

/// A reply the fake host sends for one request.
pub struct Reply {
    pub message_type: String,
    pub data: Value,
    pub delay: Duration,
}

impl Reply {
    pub fn new(message_type: &str, data: Value) -> Option<Self> {
        Some(Self {
            message_type: message_type.to_string(),
            data,
            delay: Duration::ZERO,
        })
    }

    pub fn delayed(message_type: &str, data: Value, delay: Duration) -> Option<Self> {
        Some(Self {
            message_type: message_type.to_string(),
            data,
            delay,
        })
    }
}

pub type Responder = Arc<dyn Fn(&Value) -> Option<Reply> + Send + Sync>;

pub struct FakeHost {
    pub port: u16,
    received: Arc<Mutex<Vec<Value>>>,
}

impl FakeHost {
    /// Starts a host answering every request through `responder`.
    /// Requests the responder returns `None` for are left unanswered.
    pub async fn start(responder: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = received.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let log = log.clone();
                let responder = responder.clone();
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(stream).await else {
                        return;
                    };
                    let (sink, mut stream) = ws.split();
                    let sink = Arc::new(Mutex::new(sink));
                    while let Some(Ok(msg)) = stream.next().await {
                        let Message::Text(text) = msg else {
                            continue;
                        };
                        let request: Value = serde_json::from_str(&text).unwrap();
                        log.lock().await.push(request.clone());
                        let Some(reply) = responder(&request) else {
                            continue;
                        };
                        let response = json!({
                            "apiName": "VTubeStudioPublicAPI",
                            "apiVersion": "1.0",
                            "timestamp": 1_700_000_000_000_i64,
                            "requestID": request["requestID"],
                            "messageType": reply.message_type,
                            "data": reply.data,
                        });
                        let sink = sink.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(reply.delay).await;
                            let _ = sink
                                .lock()
                                .await
                                .send(Message::Text(response.to_string()))
                                .await;
                        });
                    }
                });
            }
        });
        Self { port, received }
    }

    /// Starts a host that behaves like a cooperative VTube Studio.
    pub async fn standard() -> Self {
        Self::start(Arc::new(standard_reply)).await
    }

    /// `messageType` of every request received so far, in order.
    pub async fn message_types(&self) -> Vec<String> {
        self.received
            .lock()
            .await
            .iter()
            .map(|r| r["messageType"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub async fn requests_of(&self, message_type: &str) -> Vec<Value> {
        self.received
            .lock()
            .await
            .iter()
            .filter(|r| r["messageType"] == message_type)
            .cloned()
            .collect()
    }
}

pub fn standard_reply(request: &Value) -> Option<Reply> {
    let data = &request["data"];
    match request["messageType"].as_str()? {
        "AuthenticationTokenRequest" => Reply::new(
            "AuthenticationTokenResponse",
            json!({ "authenticationToken": ISSUED_TOKEN }),
        ),
        "AuthenticationRequest" => Reply::new(
            "AuthenticationResponse",
            json!({ "authenticated": true, "reason": "Token valid." }),
        ),
        "SetExpression" | "SetMotion" => Reply::new("SetExpressionResponse", json!({})),
        "CurrentModelRequest" => Reply::new(
            "CurrentModelResponse",
            json!({
                "modelLoaded": true,
                "modelName": "Hiyori_A",
                "modelID": "model-1",
                "vtsModelName": "hiyori_A.vtube.json",
                "numberOfTextures": 2
            }),
        ),
        "HotkeysInCurrentModelRequest" => Reply::new(
            "HotkeysInCurrentModelResponse",
            json!({
                "modelLoaded": true,
                "modelName": "Hiyori_A",
                "modelID": "model-1",
                "availableHotkeys": [
                    { "name": "Smile", "type": "ToggleExpression", "file": "smile.exp3.json", "hotkeyID": "smile-id" },
                    { "name": "Wave", "type": "TriggerAnimation", "file": "wave.motion3.json", "hotkeyID": "wave-id" }
                ]
            }),
        ),
        "HotkeyTriggerRequest" => {
            let id = data["hotkeyID"].as_str().unwrap_or_default();
            if id.ends_with("-id") {
                Reply::new("HotkeyTriggerResponse", json!({ "hotkeyID": id }))
            } else {
                Reply::new(
                    "APIError",
                    json!({ "errorID": 8, "message": format!("Hotkey {id} not found") }),
                )
            }
        }
        "ExpressionStateRequest" => Reply::new(
            "ExpressionStateResponse",
            json!({
                "modelLoaded": true,
                "modelName": "Hiyori_A",
                "modelID": "model-1",
                "expressions": [
                    { "name": "Hiyori_Happy", "file": "happy.exp3.json", "active": false },
                    { "name": "Hiyori_Sad", "file": "sad.exp3.json", "active": true }
                ]
            }),
        ),
        "ExpressionActivationRequest" => Reply::new("ExpressionActivationResponse", json!({})),
        "InputParameterListRequest" => Reply::new(
            "InputParameterListResponse",
            json!({
                "modelLoaded": true,
                "modelName": "Hiyori_A",
                "modelID": "model-1",
                "customParameters": [],
                "defaultParameters": [
                    { "name": "FaceAngleX", "addedBy": "VTube Studio", "value": 0.0, "min": -30.0, "max": 30.0, "defaultValue": 0.0 }
                ]
            }),
        ),
        "ParameterValueRequest" => Reply::new(
            "ParameterValueResponse",
            json!({
                "name": data["name"],
                "addedBy": "VTube Studio",
                "value": 1.5,
                "min": -30.0,
                "max": 30.0,
                "defaultValue": 0.0
            }),
        ),
        _ => Reply::new(
            "APIError",
            json!({ "errorID": 2, "message": "Unknown message type" }),
        ),
    }
}

/// Client configuration pointing at `host`, with files under `dir`.
pub fn config_for(host: &FakeHost, dir: &std::path::Path) -> ClientConfig {
    ClientConfig::new("127.0.0.1", host.port)
        .with_token_path(dir.join("secrets").join("token.txt"))
        .with_resources_dir(Some(dir.join("resources")))
        .with_request_timeout(Duration::from_secs(2))
        .with_auth_timeouts(Duration::from_secs(2), Duration::from_secs(2))
        .with_latency(LatencyConfig {
            window_capacity: 100,
            threshold: Duration::from_secs(2),
            watchdog_interval: Duration::from_secs(60),
        })
}
