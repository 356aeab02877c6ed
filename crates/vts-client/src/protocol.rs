//! Defines the JSON message protocol spoken with the VTube Studio public API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const API_NAME: &str = "VTubeStudioPublicAPI";
pub const API_VERSION: &str = "1.0";

/// Request kinds this client sends, each paired with the response kind it expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    AuthenticationToken,
    Authentication,
    SetExpression,
    SetMotion,
    CurrentModel,
    HotkeysInCurrentModel,
    HotkeyTrigger,
    ExpressionState,
    ExpressionActivation,
    InputParameterList,
    ParameterValue,
}

impl MessageType {
    /// The `messageType` tag sent on the request.
    pub fn request(self) -> &'static str {
        match self {
            MessageType::AuthenticationToken => "AuthenticationTokenRequest",
            MessageType::Authentication => "AuthenticationRequest",
            MessageType::SetExpression => "SetExpression",
            MessageType::SetMotion => "SetMotion",
            MessageType::CurrentModel => "CurrentModelRequest",
            MessageType::HotkeysInCurrentModel => "HotkeysInCurrentModelRequest",
            MessageType::HotkeyTrigger => "HotkeyTriggerRequest",
            MessageType::ExpressionState => "ExpressionStateRequest",
            MessageType::ExpressionActivation => "ExpressionActivationRequest",
            MessageType::InputParameterList => "InputParameterListRequest",
            MessageType::ParameterValue => "ParameterValueRequest",
        }
    }

    /// The `messageType` tag of a successful response.
    ///
    /// `None` means any non-error reply acknowledges the request.
    pub fn expected_response(self) -> Option<&'static str> {
        match self {
            MessageType::AuthenticationToken => Some("AuthenticationTokenResponse"),
            MessageType::Authentication => Some("AuthenticationResponse"),
            MessageType::SetExpression | MessageType::SetMotion => None,
            MessageType::CurrentModel => Some("CurrentModelResponse"),
            MessageType::HotkeysInCurrentModel => Some("HotkeysInCurrentModelResponse"),
            MessageType::HotkeyTrigger => Some("HotkeyTriggerResponse"),
            MessageType::ExpressionState => Some("ExpressionStateResponse"),
            MessageType::ExpressionActivation => Some("ExpressionActivationResponse"),
            MessageType::InputParameterList => Some("InputParameterListResponse"),
            MessageType::ParameterValue => Some("ParameterValueResponse"),
        }
    }

    /// Prefix of generated request IDs, which keeps host-side logs readable.
    pub fn id_prefix(self) -> &'static str {
        match self {
            MessageType::AuthenticationToken => "AuthRequest",
            MessageType::Authentication => "AuthSession",
            MessageType::SetExpression => "SetExpression",
            MessageType::SetMotion => "SetMotion",
            MessageType::CurrentModel => "GetCurrentModelInfo",
            MessageType::HotkeysInCurrentModel => "GetHotkeys",
            MessageType::HotkeyTrigger => "TriggerHotkey",
            MessageType::ExpressionState => "GetExpressions",
            MessageType::ExpressionActivation => "ActivateExpression",
            MessageType::InputParameterList => "GetInputParameters",
            MessageType::ParameterValue => "GetParameterValue",
        }
    }
}

pub const API_ERROR: &str = "APIError";

/// Outgoing request envelope.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub api_name: &'static str,
    pub api_version: &'static str,
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub message_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RequestEnvelope {
    pub fn new(request_id: String, message_type: MessageType, data: Option<Value>) -> Self {
        Self {
            api_name: API_NAME,
            api_version: API_VERSION,
            request_id,
            message_type: message_type.request(),
            data,
        }
    }
}

/// Incoming response envelope. `data` is decoded per message type later.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub api_name: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(rename = "requestID", default)]
    pub request_id: Option<String>,
    pub message_type: String,
    #[serde(default)]
    pub data: Value,
}

impl ResponseEnvelope {
    pub fn is_api_error(&self) -> bool {
        self.message_type == API_ERROR
    }
}

// --- Payloads ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationTokenRequestData<'a> {
    pub plugin_name: &'a str,
    pub plugin_developer: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_icon: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationTokenResponseData {
    pub authentication_token: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRequestData<'a> {
    pub plugin_name: &'a str,
    pub plugin_developer: &'a str,
    pub authentication_token: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponseData {
    pub authenticated: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorData {
    #[serde(rename = "errorID", default)]
    pub error_id: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of `CurrentModelResponse`. Unlisted fields are kept in `extra`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model_loaded: bool,
    #[serde(default)]
    pub model_name: String,
    #[serde(rename = "modelID", default)]
    pub model_id: String,
    #[serde(default)]
    pub vts_model_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hotkey {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: String,
    #[serde(rename = "hotkeyID")]
    pub hotkey_id: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Hotkey type that plays an animation.
pub const TRIGGER_ANIMATION: &str = "TriggerAnimation";

/// Payload of `HotkeysInCurrentModelResponse`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyList {
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub model_name: String,
    #[serde(rename = "modelID", default)]
    pub model_id: String,
    pub available_hotkeys: Vec<Hotkey>,
}

impl HotkeyList {
    /// First animation hotkey whose name matches exactly.
    pub fn find_animation(&self, name: &str) -> Option<&Hotkey> {
        self.available_hotkeys
            .iter()
            .find(|h| h.kind == TRIGGER_ANIMATION && h.name == name)
    }
}

#[derive(Deserialize, Debug)]
pub struct HotkeyTriggerResponseData {
    #[serde(rename = "hotkeyID")]
    pub hotkey_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    pub name: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `ExpressionStateResponse`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionList {
    pub model_loaded: bool,
    #[serde(default)]
    pub model_name: String,
    #[serde(rename = "modelID", default)]
    pub model_id: String,
    #[serde(default)]
    pub expressions: Vec<Expression>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub added_by: String,
    pub value: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub default_value: f64,
}

/// Payload of `InputParameterListResponse`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingParameters {
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub model_name: String,
    #[serde(rename = "modelID", default)]
    pub model_id: String,
    #[serde(default)]
    pub custom_parameters: Vec<Parameter>,
    #[serde(default)]
    pub default_parameters: Vec<Parameter>,
}
