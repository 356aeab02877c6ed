//! Snapshot files of the last fetched model, hotkey and expression state.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MODEL_INFO: &str = "current_model_info.json";
pub const HOTKEYS: &str = "available_hotkeys.json";
pub const EXPRESSIONS: &str = "available_expressions.json";
pub const TRACKING_PARAMETERS: &str = "tracking_parameters.json";
pub const LAST_TRIGGERED_HOTKEY: &str = "last_triggered_hotkey.txt";
pub const CURRENT_EXPRESSION: &str = "current_expression.txt";
pub const CURRENT_MOTION: &str = "current_motion.txt";

/// Writes snapshots into a resources directory, overwriting previous ones.
///
/// Failures are logged and swallowed: a snapshot never fails the command
/// that produced it.
#[derive(Clone, Debug, Default)]
pub struct SnapshotWriter {
    dir: Option<PathBuf>,
}

impl SnapshotWriter {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub async fn save_json<T: Serialize>(&self, name: &str, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => self.save_text(name, &text).await,
            Err(e) => warn!(file = name, error = %e, "Failed to serialize snapshot."),
        }
    }

    pub async fn save_text(&self, name: &str, text: &str) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(name);
        let result: std::io::Result<()> = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, text).await
        }
        .await;
        match result {
            Ok(()) => info!(path = %path.display(), "Snapshot saved."),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to save snapshot."),
        }
    }
}
