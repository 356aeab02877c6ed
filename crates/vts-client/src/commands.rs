//! Command layer: one method per VTube Studio request the plugin issues.
//!
//! Every command checks the authenticated gate first, sends a single request
//! through the correlated connection and interprets exactly one response.

use crate::{
    error::{Result, VtsError},
    protocol::{
        ApiErrorData, ExpressionList, HotkeyList, HotkeyTriggerResponseData, MessageType,
        ModelInfo, Parameter, ResponseEnvelope, TRIGGER_ANIMATION, TrackingParameters,
    },
    session::VtsClient,
    snapshot,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Avatar side effect requested by the reply pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AvatarAction {
    Expression(String),
    Motion(String),
}

/// Fails on `APIError` or on a message type other than the expected one.
pub(crate) fn check(response: &ResponseEnvelope, message_type: MessageType) -> Result<()> {
    if response.is_api_error() {
        let data: ApiErrorData = serde_json::from_value(response.data.clone())
            .map_err(|e| VtsError::Protocol(format!("malformed APIError payload: {e}")))?;
        return Err(VtsError::Api {
            error_id: data.error_id,
            message: data.message.unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    match message_type.expected_response() {
        Some(expected) if response.message_type != expected => Err(VtsError::Protocol(format!(
            "expected {expected}, got {}",
            response.message_type
        ))),
        _ => Ok(()),
    }
}

/// Checks the response kind, then decodes its `data` payload.
pub(crate) fn interpret<T: DeserializeOwned>(
    response: ResponseEnvelope,
    message_type: MessageType,
) -> Result<T> {
    check(&response, message_type)?;
    serde_json::from_value(response.data).map_err(|e| {
        VtsError::Protocol(format!(
            "malformed {} payload: {e}",
            response.message_type
        ))
    })
}

impl VtsClient {
    async fn call(
        &self,
        operation: &str,
        message_type: MessageType,
        data: Option<Value>,
    ) -> Result<ResponseEnvelope> {
        let connection = self.ready(operation)?;
        let response = connection
            .exchange(message_type, data, self.config.request_timeout)
            .await
            .inspect_err(|e| error!(operation, error = %e, "Request failed."))?;
        check(&response, message_type)
            .inspect_err(|e| error!(operation, error = %e, "Request rejected."))?;
        Ok(response)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        operation: &str,
        message_type: MessageType,
        data: Option<Value>,
    ) -> Result<T> {
        let response = self.call(operation, message_type, data).await?;
        interpret(response, message_type)
            .inspect_err(|e| error!(operation, error = %e, "Malformed response."))
    }

    /// Sends a timed expression or motion change and records its round trip.
    async fn timed_change(
        &self,
        operation: &str,
        message_type: MessageType,
        data: Value,
    ) -> Result<Duration> {
        let connection = self.ready(operation)?;
        let started = Instant::now();
        let response = connection
            .exchange(message_type, Some(data), self.config.request_timeout)
            .await
            .inspect_err(|e| error!(operation, error = %e, "Request failed."))?;
        let latency = started.elapsed();
        self.latency.record(latency);
        check(&response, message_type)
            .inspect_err(|e| error!(operation, error = %e, "Request rejected."))?;
        Ok(latency)
    }

    /// Sets the expression mapped to `key` and returns the round-trip time.
    pub async fn set_expression(&self, key: &str) -> Result<Duration> {
        self.ready("set_expression")?;
        let name = self.config.expression_name(key).ok_or_else(|| {
            error!(key, "Unknown expression key.");
            VtsError::UnknownKey {
                kind: "expression",
                key: key.to_string(),
            }
        })?;
        let latency = self
            .timed_change(
                "set_expression",
                MessageType::SetExpression,
                json!({ "expressionName": name }),
            )
            .await?;
        info!(
            expression = name,
            latency_ms = latency.as_millis() as u64,
            "Set expression '{name}', latency {:.2}s",
            latency.as_secs_f64()
        );
        Ok(latency)
    }

    /// Plays the motion mapped to `key` and returns the round-trip time.
    pub async fn set_motion(&self, key: &str) -> Result<Duration> {
        self.ready("set_motion")?;
        let name = self.config.motion_name(key).ok_or_else(|| {
            error!(key, "Unknown motion key.");
            VtsError::UnknownKey {
                kind: "motion",
                key: key.to_string(),
            }
        })?;
        let latency = self
            .timed_change(
                "set_motion",
                MessageType::SetMotion,
                json!({ "motionName": name }),
            )
            .await?;
        info!(
            motion = name,
            latency_ms = latency.as_millis() as u64,
            "Set motion '{name}', latency {:.2}s",
            latency.as_secs_f64()
        );
        Ok(latency)
    }

    /// Applies an avatar action chosen by the reply pipeline.
    pub async fn apply(&self, action: &AvatarAction) -> Result<Duration> {
        match action {
            AvatarAction::Expression(key) => self.set_expression(key).await,
            AvatarAction::Motion(key) => self.set_motion(key).await,
        }
    }

    /// Information about the loaded model, or `None` if no model is loaded.
    pub async fn current_model(&self) -> Result<Option<ModelInfo>> {
        let info: ModelInfo = self
            .request("current_model", MessageType::CurrentModel, None)
            .await?;
        if !info.model_loaded {
            warn!("No model is currently loaded.");
            return Ok(None);
        }
        info!(model = %info.model_name, "Fetched current model info.");
        self.snapshots.save_json(snapshot::MODEL_INFO, &info).await;
        Ok(Some(info))
    }

    async fn fetch_hotkeys(&self, operation: &str, model_id: Option<&str>) -> Result<HotkeyList> {
        let mut data = Map::new();
        if let Some(model_id) = model_id {
            data.insert("modelID".to_string(), json!(model_id));
        }
        self.request(
            operation,
            MessageType::HotkeysInCurrentModel,
            Some(Value::Object(data)),
        )
        .await
    }

    /// Hotkeys of the loaded model, or of `model_id` when given.
    pub async fn list_hotkeys(&self, model_id: Option<&str>) -> Result<HotkeyList> {
        let hotkeys = self.fetch_hotkeys("list_hotkeys", model_id).await?;
        info!(
            model = %hotkeys.model_name,
            count = hotkeys.available_hotkeys.len(),
            "Fetched hotkey list."
        );
        self.snapshots.save_json(snapshot::HOTKEYS, &hotkeys).await;
        Ok(hotkeys)
    }

    /// Triggers a hotkey by ID and returns the ID the host confirmed.
    pub async fn trigger_hotkey(
        &self,
        hotkey_id: &str,
        item_instance_id: Option<&str>,
    ) -> Result<String> {
        let mut data = json!({ "hotkeyID": hotkey_id });
        if let Some(instance) = item_instance_id {
            data["itemInstanceID"] = json!(instance);
        }
        let response = self
            .call("trigger_hotkey", MessageType::HotkeyTrigger, Some(data))
            .await?;
        let timestamp = response.timestamp;
        let triggered: HotkeyTriggerResponseData =
            interpret(response, MessageType::HotkeyTrigger)?;
        info!(hotkey_id = %triggered.hotkey_id, "Triggered hotkey.");
        let record = match timestamp {
            Some(ts) => format!("Hotkey ID: {}\nTriggered at: {ts}", triggered.hotkey_id),
            None => format!("Hotkey ID: {}", triggered.hotkey_id),
        };
        self.snapshots
            .save_text(snapshot::LAST_TRIGGERED_HOTKEY, &record)
            .await;
        Ok(triggered.hotkey_id)
    }

    /// Finds the `TriggerAnimation` hotkey called `name` and triggers it.
    ///
    /// Returns `UnknownKey` without sending a trigger when no hotkey matches.
    pub async fn trigger_animation_by_name(&self, name: &str) -> Result<String> {
        let hotkeys = self.list_hotkeys(None).await?;
        let Some(hotkey) = hotkeys.find_animation(name) else {
            error!(animation = name, "No animation hotkey with this name.");
            return Err(VtsError::UnknownKey {
                kind: "animation",
                key: name.to_string(),
            });
        };
        self.trigger_hotkey(&hotkey.hotkey_id, None).await
    }

    /// Configured key of the first active animation hotkey, if it has one.
    ///
    /// The hotkey's `file` is matched against the configured motion names.
    pub async fn current_motion(&self) -> Result<Option<String>> {
        let hotkeys = self.fetch_hotkeys("current_motion", None).await?;
        if !hotkeys.model_loaded {
            warn!("No model is loaded, cannot read the current motion.");
            return Ok(None);
        }
        let key = hotkeys
            .available_hotkeys
            .iter()
            .filter(|h| h.kind == TRIGGER_ANIMATION && h.is_active)
            .find_map(|h| self.config.motion_key(&h.file))
            .map(str::to_string);
        match &key {
            Some(key) => {
                self.snapshots
                    .save_text(snapshot::CURRENT_MOTION, key)
                    .await
            }
            None => info!("No configured motion is active."),
        }
        Ok(key)
    }

    async fn fetch_expressions(
        &self,
        operation: &str,
        details: bool,
        expression_file: Option<&str>,
    ) -> Result<ExpressionList> {
        let mut data = json!({ "details": details });
        if let Some(file) = expression_file {
            data["expressionFile"] = json!(file);
        }
        self.request(operation, MessageType::ExpressionState, Some(data))
            .await
    }

    /// Expression state of the loaded model, or `None` if no model is loaded.
    pub async fn list_expressions(
        &self,
        details: bool,
        expression_file: Option<&str>,
    ) -> Result<Option<ExpressionList>> {
        let expressions = self
            .fetch_expressions("list_expressions", details, expression_file)
            .await?;
        if !expressions.model_loaded {
            warn!("No model is loaded, cannot list expressions.");
            return Ok(None);
        }
        info!(
            model = %expressions.model_name,
            count = expressions.expressions.len(),
            "Fetched expression list."
        );
        self.snapshots
            .save_json(snapshot::EXPRESSIONS, &expressions)
            .await;
        Ok(Some(expressions))
    }

    /// Configured key of the first active expression, if it has one.
    pub async fn current_expression(&self) -> Result<Option<String>> {
        let list = self
            .fetch_expressions("current_expression", false, None)
            .await?;
        if !list.model_loaded {
            warn!("No model is loaded, cannot read the current expression.");
            return Ok(None);
        }
        let key = list
            .expressions
            .iter()
            .filter(|e| e.active)
            .find_map(|e| self.config.expression_key(&e.name))
            .map(str::to_string);
        match &key {
            Some(key) => {
                self.snapshots
                    .save_text(snapshot::CURRENT_EXPRESSION, key)
                    .await
            }
            None => info!("No configured expression is active."),
        }
        Ok(key)
    }

    /// Turns an expression file on or off with the given fade time in seconds.
    pub async fn activate_expression(
        &self,
        expression_file: &str,
        active: bool,
        fade_time: f64,
    ) -> Result<()> {
        let data = json!({
            "expressionFile": expression_file,
            "active": active,
            "fadeTime": fade_time,
        });
        self.call(
            "activate_expression",
            MessageType::ExpressionActivation,
            Some(data),
        )
        .await?;
        info!(expression_file, active, "Expression activation applied.");
        Ok(())
    }

    /// Default and custom tracking parameters available to the model.
    pub async fn tracking_parameters(&self) -> Result<TrackingParameters> {
        let params: TrackingParameters = self
            .request(
                "tracking_parameters",
                MessageType::InputParameterList,
                None,
            )
            .await?;
        info!(
            default = params.default_parameters.len(),
            custom = params.custom_parameters.len(),
            "Fetched tracking parameters."
        );
        self.snapshots
            .save_json(snapshot::TRACKING_PARAMETERS, &params)
            .await;
        Ok(params)
    }

    pub async fn parameter_value(&self, name: &str) -> Result<Parameter> {
        self.request(
            "parameter_value",
            MessageType::ParameterValue,
            Some(json!({ "name": name })),
        )
        .await
    }

    /// Reads several parameters one request at a time, in order.
    pub async fn parameter_values<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Parameter>> {
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            values.push(self.parameter_value(name.as_ref()).await?);
        }
        Ok(values)
    }
}
