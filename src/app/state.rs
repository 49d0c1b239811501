//! Defines the central, mutable state of the application.

use crate::config::{self, AppConfig};
use crate::core::{
    CancellationFlag, ContextConfiguration, FilterCriteria, FilterSummary, FolderTree,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Holds the complete, mutable state of one session.
///
/// This struct is wrapped in an `Arc<Mutex<...>>` to allow for safe, shared access
/// from the host's event handlers and the async tasks.
pub struct AppState {
    /// The application's settings.
    pub config: AppConfig,
    /// Where `config` is persisted; `None` means the platform default location.
    pub config_path: Option<PathBuf>,
    /// The open folder tree. `None` when no folder is open, and also while a filter task
    /// owns the tree.
    pub tree: Option<FolderTree>,
    /// The configuration the session was opened with or last saved as.
    pub current_configuration: ContextConfiguration,
    /// The `.ctx` file backing `current_configuration`, if any.
    pub current_configuration_path: Option<PathBuf>,
    /// The criteria of the most recent filter run.
    pub filter_criteria: FilterCriteria,
    pub last_filter_summary: Option<FilterSummary>,
    pub status_message: String,
    /// `true` while a filter task owns the tree.
    pub is_filtering: bool,
    pub is_exporting: bool,
    /// A flag used to signal cancellation to the filter task.
    pub filter_cancellation_flag: CancellationFlag,
    /// A flag used to signal cancellation to the export task.
    pub export_cancellation_flag: CancellationFlag,
    /// The node currently shown in the preview pane.
    pub previewed_path: Option<PathBuf>,
    pub estimated_tokens: Option<usize>,
}

impl Default for AppState {
    /// Creates a default `AppState` instance, loading the settings from disk.
    fn default() -> Self {
        Self::with_config(AppConfig::load().unwrap_or_default(), None)
    }
}

impl AppState {
    pub fn with_config(config: AppConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            tree: None,
            current_configuration: ContextConfiguration::default(),
            current_configuration_path: None,
            filter_criteria: FilterCriteria::default(),
            last_filter_summary: None,
            status_message: "Ready".to_string(),
            is_filtering: false,
            is_exporting: false,
            filter_cancellation_flag: Arc::new(AtomicBool::new(false)),
            export_cancellation_flag: Arc::new(AtomicBool::new(false)),
            previewed_path: None,
            estimated_tokens: None,
        }
    }

    /// `true` if tree commands may run now. Sets a status message otherwise.
    pub fn tree_available(&mut self) -> bool {
        if self.is_filtering {
            self.status_message = "Filter in progress".to_string();
            return false;
        }
        if self.tree.is_none() {
            self.status_message = "No folder loaded".to_string();
            return false;
        }
        true
    }

    /// Signals the running filter task, if any, to stop.
    pub fn cancel_current_filter(&mut self) {
        if self.is_filtering {
            tracing::info!("Cancelling filter task");
            self.filter_cancellation_flag.store(true, Ordering::SeqCst);
        }
    }

    pub fn cancel_current_export(&mut self) {
        if self.is_exporting {
            self.export_cancellation_flag.store(true, Ordering::SeqCst);
        }
    }

    /// Drops the open tree and everything derived from it.
    pub fn reset_folder_state(&mut self) {
        self.cancel_current_filter();
        self.cancel_current_export();
        self.tree = None;
        self.current_configuration = ContextConfiguration::default();
        self.current_configuration_path = None;
        self.last_filter_summary = None;
        self.previewed_path = None;
        self.estimated_tokens = None;
    }

    /// Writes the settings to disk. Failures are logged, never fatal.
    pub fn persist_config(&self) {
        if let Err(e) = config::settings::save_config(&self.config, self.config_path.as_deref()) {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }
}
