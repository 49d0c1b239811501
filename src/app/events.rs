//! Defines the event and message structures exchanged between the application layer and its host.

use serde::Deserialize;
use std::path::PathBuf;

use super::view_model::UiState;
use crate::core::{ExportReport, FilterOutcome};

/// Events sent from the application layer to the host (a GUI event loop or the CLI).
#[derive(Debug)]
pub enum UserEvent {
    /// A complete state update to re-render the UI.
    StateUpdate(Box<UiState>),
    /// Content for the preview pane: a file's text or a folder description.
    ShowPreview { path: PathBuf, content: String },
    /// An error message to be displayed to the user.
    ShowError(String),
    /// A filter pass finished or was cancelled.
    FilterFinished(FilterOutcome),
    /// The result of an export.
    ExportFinished {
        path: PathBuf,
        result: Result<ExportReport, String>,
    },
    /// A token estimate for the current selection.
    TokenEstimate {
        tokens: usize,
        files: usize,
        bytes: u64,
    },
    /// A context configuration was written to disk.
    ConfigurationSaved(PathBuf),
}

/// A message received from the host's IPC channel.
#[derive(Deserialize, Debug)]
pub struct IpcMessage {
    /// The name of the command to execute.
    pub command: String,
    /// The payload associated with the command, as a JSON value.
    #[serde(default)]
    pub payload: serde_json::Value,
}
