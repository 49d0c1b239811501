//! The application layer: session state, command handlers, async tasks and the view
//! model a host renders.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod proxy;
pub mod state;
pub mod tasks;
pub mod view_model;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use self::events::{IpcMessage, UserEvent};
use self::proxy::EventProxy;
use self::state::AppState;
use crate::core::{ExportFormat, FilterCriteria};

#[derive(Deserialize)]
struct PathPayload {
    path: PathBuf,
}

#[derive(Deserialize)]
struct SelectionPayload {
    path: PathBuf,
    selected: bool,
}

#[derive(Deserialize)]
struct DetailsPayload {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct ExportPayload {
    path: PathBuf,
    #[serde(default)]
    format: Option<ExportFormat>,
}

fn parse_payload<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|e| format!("Invalid payload: {}", e))
}

/// Dispatches a JSON message from the host to the matching command handler.
///
/// Must be called from within a tokio runtime, since some commands spawn tasks.
pub fn handle_ipc_message<P: EventProxy>(message: &str, proxy: P, state: Arc<Mutex<AppState>>) {
    let msg: IpcMessage = match serde_json::from_str(message) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::error!("Failed to parse IPC message: {}", e);
            proxy.send_event(UserEvent::ShowError(format!("Invalid message: {}", e)));
            return;
        }
    };
    tracing::debug!("IPC command '{}'", msg.command);

    if let Err(message) = dispatch(msg, proxy.clone(), state) {
        tracing::warn!("{}", message);
        proxy.send_event(UserEvent::ShowError(message));
    }
}

fn dispatch<P: EventProxy>(
    msg: IpcMessage,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Result<(), String> {
    match msg.command.as_str() {
        "openFolder" => {
            let p: PathPayload = parse_payload(msg.payload)?;
            commands::open_folder(p.path, proxy, state);
        }
        "openRecentFolder" => {
            let p: PathPayload = parse_payload(msg.payload)?;
            commands::open_recent_folder(p.path, proxy, state);
        }
        "closeFolder" => commands::close_folder(proxy, state),
        "toggleSelection" => {
            let p: PathPayload = parse_payload(msg.payload)?;
            commands::toggle_selection(p.path, proxy, state);
        }
        "setSelection" => {
            let p: SelectionPayload = parse_payload(msg.payload)?;
            commands::set_selection(p.path, p.selected, proxy, state);
        }
        "toggleExpansion" => {
            let p: PathPayload = parse_payload(msg.payload)?;
            commands::toggle_expansion(p.path, proxy, state);
        }
        "selectAll" => commands::select_all(proxy, state),
        "deselectAll" => commands::deselect_all(proxy, state),
        "invertSelection" => commands::invert_selection(proxy, state),
        "selectMatches" => commands::select_matches(proxy, state),
        "collapseAll" => commands::collapse_all(proxy, state),
        "expandAll" => commands::expand_all(proxy, state),
        "applyFilter" => {
            let criteria: FilterCriteria = parse_payload(msg.payload)?;
            tasks::start_filter(criteria, proxy, state);
        }
        "cancelFilter" => commands::cancel_filter(proxy, state),
        "clearFilters" => commands::clear_filters(proxy, state),
        "loadPreview" => {
            let p: PathPayload = parse_payload(msg.payload)?;
            commands::load_preview(p.path, proxy, state);
        }
        "setConfigurationDetails" => {
            let p: DetailsPayload = parse_payload(msg.payload)?;
            commands::set_configuration_details(p.name, p.description, proxy, state);
        }
        "saveConfiguration" => {
            let p: PathPayload = parse_payload(msg.payload)?;
            commands::save_configuration(p.path, proxy, state);
        }
        "loadConfiguration" => {
            let p: PathPayload = parse_payload(msg.payload)?;
            commands::load_configuration(p.path, proxy, state);
        }
        "exportContext" => {
            let p: ExportPayload = parse_payload(msg.payload)?;
            tasks::start_export(p.path, p.format, proxy, state);
        }
        "cancelExport" => commands::cancel_export(proxy, state),
        "estimateTokens" => {
            tasks::start_token_estimate(proxy, state);
        }
        "initialize" => helpers::with_state_and_notify(&state, &proxy, |_| {}),
        other => return Err(format!("Unknown command: {}", other)),
    }
    Ok(())
}
