//! Long-running operations that run on the tokio runtime.
//!
//! Each task prepares the state under the lock, does its work without holding it, and
//! then publishes the result with a final `StateUpdate`.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::events::UserEvent;
use super::helpers::{lock_state, notify};
use super::proxy::EventProxy;
use super::state::AppState;
use crate::core::{ContextExporter, ExportFormat, FilterCriteria, FilterEngine, FilterOutcome};

/// Starts a filter pass over the open tree.
///
/// The task takes the tree out of the state for the duration of the pass, so other
/// tree commands are no-ops until it finishes. Returns `None` if no pass was started.
pub fn start_filter<P: EventProxy>(
    criteria: FilterCriteria,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    let (mut tree, cancel_flag) = {
        let mut s = lock_state(&state);
        if !s.tree_available() {
            notify(&s, &proxy);
            return None;
        }
        let tree = s.tree.take()?;
        let cancel_flag = Arc::new(AtomicBool::new(false));
        s.filter_cancellation_flag = cancel_flag.clone();
        s.filter_criteria = criteria.clone();
        s.is_filtering = true;
        s.status_message = "Applying filter...".to_string();
        notify(&s, &proxy);
        (tree, cancel_flag)
    };

    Some(tokio::spawn(async move {
        let outcome = FilterEngine::apply_filter(&mut tree, &criteria, &cancel_flag).await;

        let mut s = lock_state(&state);
        s.tree = Some(tree);
        s.is_filtering = false;
        match outcome {
            FilterOutcome::Completed(summary) => {
                s.last_filter_summary = Some(summary);
                s.status_message = "Filter applied".to_string();
            }
            FilterOutcome::Cancelled => {
                s.last_filter_summary = None;
                s.status_message = "Filter cancelled".to_string();
            }
        }
        proxy.send_event(UserEvent::FilterFinished(outcome));
        notify(&s, &proxy);
    }))
}

/// Exports the current selection to `output`.
///
/// The format is taken from `format`, or derived from the output extension when `None`.
pub fn start_export<P: EventProxy>(
    output: PathBuf,
    format: Option<ExportFormat>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    let (files, cancel_flag) = {
        let mut s = lock_state(&state);
        if !s.tree_available() {
            proxy.send_event(UserEvent::ShowError(s.status_message.clone()));
            notify(&s, &proxy);
            return None;
        }
        let files = s
            .tree
            .as_mut()
            .map(|tree| tree.selected_file_paths())
            .unwrap_or_default();
        if files.is_empty() {
            s.status_message = "No files selected for export".to_string();
            notify(&s, &proxy);
            return None;
        }
        let cancel_flag = Arc::new(AtomicBool::new(false));
        s.export_cancellation_flag = cancel_flag.clone();
        s.is_exporting = true;
        s.status_message = "Exporting context...".to_string();
        notify(&s, &proxy);
        (files, cancel_flag)
    };
    let format = format.unwrap_or_else(|| ExportFormat::from_path(&output));

    Some(tokio::spawn(async move {
        let result = ContextExporter::export_to_file(&files, &output, format, &cancel_flag).await;

        let mut s = lock_state(&state);
        s.is_exporting = false;
        let result = match result {
            Ok(report) => {
                s.status_message = "Context exported successfully".to_string();
                s.config.last_export_directory = output.parent().map(|p| p.to_path_buf());
                s.persist_config();
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Export to {} failed: {}", output.display(), e);
                s.status_message = format!("Error exporting context: {}", e);
                Err(e.to_string())
            }
        };
        proxy.send_event(UserEvent::ExportFinished {
            path: output,
            result,
        });
        notify(&s, &proxy);
    }))
}

/// Estimates the token count of the current selection on a blocking worker.
pub fn start_token_estimate<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    let files = {
        let mut s = lock_state(&state);
        if !s.tree_available() {
            notify(&s, &proxy);
            return None;
        }
        let files = s
            .tree
            .as_mut()
            .map(|tree| tree.selected_file_paths())
            .unwrap_or_default();
        if files.is_empty() {
            s.status_message = "No files selected".to_string();
            s.estimated_tokens = Some(0);
            notify(&s, &proxy);
            return None;
        }
        s.status_message = "Estimating token count...".to_string();
        notify(&s, &proxy);
        files
    };

    Some(tokio::spawn(async move {
        let file_count = files.len();
        let estimate = tokio::task::spawn_blocking(move || {
            (
                ContextExporter::estimate_tokens(&files),
                ContextExporter::total_size(&files),
            )
        })
        .await;

        let mut s = lock_state(&state);
        match estimate {
            Ok((tokens, bytes)) => {
                s.estimated_tokens = Some(tokens);
                s.status_message = "Token estimation complete".to_string();
                proxy.send_event(UserEvent::TokenEstimate {
                    tokens,
                    files: file_count,
                    bytes,
                });
            }
            Err(e) => {
                tracing::error!("Token estimation worker failed: {}", e);
                s.status_message = format!("Error estimating tokens: {}", e);
            }
        }
        notify(&s, &proxy);
    }))
}
