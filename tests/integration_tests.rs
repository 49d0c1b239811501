//! Integration tests for Context Creator.
//!
//! These tests drive the application layer through `handle_ipc_message`, the way a GUI
//! host would, and observe it through an async-aware MPSC channel from `tokio::sync`.

use context_creator::app::{self, events::UserEvent, proxy::EventProxy, state::AppState};
use context_creator::config::{self, AppConfig};
use context_creator::core::{FilterCriteria, FilterEngine, FilterOutcome, FolderTree, MatchType};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tracing_test::traced_test;

/// Contains the test infrastructure.
mod helpers {
    use super::*;
    use context_creator::utils::test_helpers::create_hello_project;

    /// A test double for the host's event loop using a tokio MPSC channel.
    #[derive(Clone)]
    pub struct TestEventProxy {
        pub sender: mpsc::UnboundedSender<UserEvent>,
    }

    impl EventProxy for TestEventProxy {
        fn send_event(&self, event: UserEvent) {
            if let Err(e) = self.sender.send(event) {
                // Panic in a test if the receiver is dropped, as it indicates a test setup error.
                panic!("Test receiver dropped: {}", e);
            }
        }
    }

    /// `TestHarness` sets up a complete, isolated environment for each test case.
    pub struct TestHarness {
        pub state: Arc<Mutex<AppState>>,
        pub proxy: TestEventProxy,
        pub event_rx: mpsc::UnboundedReceiver<UserEvent>,
        /// The `project/` fixture from `create_hello_project`.
        pub root_path: PathBuf,
        pub settings_path: PathBuf,
        pub temp_dir: TempDir,
    }

    impl TestHarness {
        /// Creates a new test harness with clean settings stored inside the temp dir.
        pub fn new() -> Self {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let root_path = create_hello_project(temp_dir.path());
            let settings_path = temp_dir.path().join("settings.json");
            let (event_tx, event_rx) = mpsc::unbounded_channel();

            let config = AppConfig {
                last_export_directory: Some(temp_dir.path().to_path_buf()),
                ..Default::default()
            };
            let state = AppState::with_config(config, Some(settings_path.clone()));

            Self {
                state: Arc::new(Mutex::new(state)),
                proxy: TestEventProxy { sender: event_tx },
                event_rx,
                root_path,
                settings_path,
                temp_dir,
            }
        }

        /// Sends an IPC message as the host would.
        pub fn send(&self, command: &str, payload: serde_json::Value) {
            let message = json!({ "command": command, "payload": payload }).to_string();
            app::handle_ipc_message(&message, self.proxy.clone(), self.state.clone());
        }

        pub fn open_project(&mut self) {
            self.send("openFolder", json!({ "path": self.root_path }));
        }

        /// Waits for the first event accepted by `pick`, skipping all others.
        pub async fn wait_for<T>(&mut self, mut pick: impl FnMut(UserEvent) -> Option<T>) -> T {
            loop {
                match tokio::time::timeout(Duration::from_secs(5), self.event_rx.recv()).await {
                    Ok(Some(event)) => {
                        if let Some(found) = pick(event) {
                            return found;
                        }
                    }
                    _ => panic!("Expected event did not arrive within timeout or channel closed"),
                }
            }
        }

        pub async fn wait_for_filter(&mut self) -> FilterOutcome {
            self.wait_for(|event| match event {
                UserEvent::FilterFinished(outcome) => Some(outcome),
                _ => None,
            })
            .await
        }

        /// Drains queued events and returns the status message of the last state update.
        pub fn latest_status(&mut self) -> String {
            let mut status = None;
            while let Ok(event) = self.event_rx.try_recv() {
                if let UserEvent::StateUpdate(ui) = event {
                    status = Some(ui.status_message.clone());
                }
            }
            status.expect("No state update was sent")
        }

        pub fn match_of(&self, relative: &str) -> MatchType {
            let state = self.state.lock().unwrap();
            let tree = state.tree.as_ref().expect("tree should be present");
            let path = if relative.is_empty() {
                self.root_path.clone()
            } else {
                self.root_path.join(relative)
            };
            let id = tree.find(&path).expect("node exists");
            tree.node(id).unwrap().match_type()
        }

        pub fn selected_paths(&self) -> Vec<PathBuf> {
            let mut state = self.state.lock().unwrap();
            state.tree.as_mut().expect("tree").selected_file_paths()
        }
    }

    /// Returns true when the current process runs as root (UID 0).
    /// We use this to skip permission-sensitive tests in Docker/act.
    pub fn running_as_root() -> bool {
        #[cfg(unix)]
        {
            // SAFETY: libc call has no side effects; used for testing only.
            unsafe { libc::geteuid() == 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

#[tokio::test]
async fn test_content_filter_through_ipc() {
    let mut harness = helpers::TestHarness::new();
    harness.open_project();

    harness.send(
        "applyFilter",
        json!({ "target": "Content", "expression": "hello" }),
    );
    let outcome = harness.wait_for_filter().await;

    let FilterOutcome::Completed(summary) = outcome else {
        panic!("filter should complete, got {:?}", outcome);
    };
    assert_eq!(summary.direct_files, 2);
    assert_eq!(harness.match_of("a.txt"), MatchType::Direct);
    assert_eq!(harness.match_of("sub/c.txt"), MatchType::Direct);
    assert_eq!(harness.match_of("b.log"), MatchType::None);
    assert_eq!(harness.match_of("sub"), MatchType::Ancestor);
    assert_eq!(harness.match_of(""), MatchType::Ancestor);

    let ui = harness
        .wait_for(|event| match event {
            UserEvent::StateUpdate(ui) => Some(ui),
            _ => None,
        })
        .await;
    assert_eq!(ui.status_message, "Filter applied");
    assert!(!ui.is_filtering);
    let tree = ui.tree.expect("tree view");
    let sub = tree.children.iter().find(|c| c.name == "sub").unwrap();
    assert!(sub.is_expanded, "folders containing matches are expanded");
}

#[tokio::test]
async fn test_exclude_by_name_then_select_matches() {
    let mut harness = helpers::TestHarness::new();
    harness.open_project();

    harness.send(
        "applyFilter",
        json!({ "target": "FileName", "expression": "log", "action": "Exclude" }),
    );
    harness.wait_for_filter().await;
    assert_eq!(harness.match_of("b.log"), MatchType::None);
    assert_eq!(harness.match_of("a.txt"), MatchType::Direct);

    harness.send("selectMatches", json!(null));
    assert_eq!(
        harness.selected_paths(),
        vec![harness.root_path.join("a.txt"), harness.root_path.join("sub").join("c.txt")]
    );

    harness.send("clearFilters", json!(null));
    assert_eq!(harness.match_of("a.txt"), MatchType::None);
    assert_eq!(harness.latest_status(), "Filters cleared");
}

#[tokio::test]
async fn test_tree_commands_are_ignored_while_filtering() {
    let mut harness = helpers::TestHarness::new();
    harness.open_project();

    // The spawned task is not polled until this test yields, so the filter is still
    // "running" when the next commands arrive.
    let handle = app::tasks::start_filter(
        FilterCriteria::content("hello"),
        harness.proxy.clone(),
        harness.state.clone(),
    )
    .expect("filter should start");
    assert!(harness.state.lock().unwrap().is_filtering);

    harness.send("selectAll", json!(null));
    harness.send("openFolder", json!({ "path": harness.temp_dir.path() }));
    assert_eq!(harness.latest_status(), "Filter in progress");

    handle.await.unwrap();
    let state = harness.state.lock().unwrap();
    assert!(!state.is_filtering);
    let tree = state.tree.as_ref().expect("tree is returned after the pass");
    assert_eq!(tree.root_path(), harness.root_path);
    assert!(!tree.node(tree.root()).unwrap().is_selected());
}

#[tokio::test]
async fn test_cancelled_filter_leaves_no_matches() {
    let mut harness = helpers::TestHarness::new();
    harness.open_project();

    harness.send("applyFilter", json!({ "expression": "hello" }));
    harness.send("cancelFilter", json!(null));
    let outcome = harness.wait_for_filter().await;

    assert_eq!(outcome, FilterOutcome::Cancelled);
    assert_eq!(harness.match_of("a.txt"), MatchType::None);
    assert_eq!(harness.match_of("sub"), MatchType::None);
    let state = harness.state.lock().unwrap();
    assert_eq!(state.status_message, "Filter cancelled");
    assert!(state.last_filter_summary.is_none());
}

#[tokio::test]
async fn test_export_json_through_ipc() {
    let mut harness = helpers::TestHarness::new();
    harness.open_project();
    harness.send("selectAll", json!(null));

    let output = harness.temp_dir.path().join("context.json");
    harness.send("exportContext", json!({ "path": output }));
    let (path, result) = harness
        .wait_for(|event| match event {
            UserEvent::ExportFinished { path, result } => Some((path, result)),
            _ => None,
        })
        .await;

    assert_eq!(path, output);
    let report = result.expect("export should succeed");
    assert_eq!(report.files_written, 3);

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let names: Vec<&str> = parsed["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.log", "c.txt"]);

    let state = harness.state.lock().unwrap();
    assert_eq!(state.status_message, "Context exported successfully");
    assert_eq!(
        state.config.last_export_directory.as_deref(),
        Some(harness.temp_dir.path())
    );
}

#[tokio::test]
async fn test_export_without_selection_reports_status() {
    let mut harness = helpers::TestHarness::new();
    harness.open_project();

    harness.send(
        "exportContext",
        json!({ "path": harness.temp_dir.path().join("out.md") }),
    );

    assert_eq!(harness.latest_status(), "No files selected for export");
    assert!(!harness.temp_dir.path().join("out.md").exists());
}

#[tokio::test]
async fn test_token_estimate_through_ipc() {
    let mut harness = helpers::TestHarness::new();
    harness.open_project();
    harness.send("toggleSelection", json!({ "path": harness.root_path.join("a.txt") }));
    harness.send("toggleSelection", json!({ "path": harness.root_path.join("sub") }));

    harness.send("estimateTokens", json!(null));
    let (tokens, files, bytes) = harness
        .wait_for(|event| match event {
            UserEvent::TokenEstimate {
                tokens,
                files,
                bytes,
            } => Some((tokens, files, bytes)),
            _ => None,
        })
        .await;

    // "hello world" and "hello again": 11 chars each, 2 tokens each.
    assert_eq!(tokens, 4);
    assert_eq!(files, 2);
    assert_eq!(bytes, 22);
}

#[tokio::test]
async fn test_configuration_round_trip_and_recent_lists() {
    let mut harness = helpers::TestHarness::new();
    harness.open_project();
    harness.send("setSelection", json!({ "path": harness.root_path.join("b.log"), "selected": true }));
    harness.send("setConfigurationDetails", json!({ "name": "Logs" }));

    let ctx = harness.temp_dir.path().join("logs.ctx");
    harness.send("saveConfiguration", json!({ "path": ctx }));
    let saved = harness
        .wait_for(|event| match event {
            UserEvent::ConfigurationSaved(path) => Some(path),
            _ => None,
        })
        .await;
    assert_eq!(saved, ctx);

    harness.send("closeFolder", json!(null));
    assert!(harness.state.lock().unwrap().tree.is_none());

    harness.send("loadConfiguration", json!({ "path": ctx }));
    assert_eq!(harness.latest_status(), "Configuration loaded successfully");
    assert_eq!(harness.selected_paths(), vec![harness.root_path.join("b.log")]);
    assert_eq!(harness.state.lock().unwrap().current_configuration.name, "Logs");

    let persisted = config::settings::load_config(Some(&harness.settings_path)).unwrap();
    assert_eq!(persisted.recent_configurations, vec![ctx]);
    assert_eq!(persisted.recent_folders, vec![harness.root_path.clone()]);
}

#[tokio::test]
async fn test_invalid_messages_show_errors() {
    let mut harness = helpers::TestHarness::new();

    harness.send("doSomethingElse", json!(null));
    let message = harness
        .wait_for(|event| match event {
            UserEvent::ShowError(message) => Some(message),
            _ => None,
        })
        .await;
    assert_eq!(message, "Unknown command: doSomethingElse");

    harness.send("openFolder", json!({ "wrong": 1 }));
    let message = harness
        .wait_for(|event| match event {
            UserEvent::ShowError(message) => Some(message),
            _ => None,
        })
        .await;
    assert!(message.starts_with("Invalid payload"));
}

#[tokio::test]
#[traced_test]
async fn test_invalid_regex_is_logged_and_matches_nothing() {
    let harness = helpers::TestHarness::new();
    let mut tree = FolderTree::open(&harness.root_path).unwrap();

    let outcome = FilterEngine::apply_filter(
        &mut tree,
        &FilterCriteria::file_name("(a|b").regex(),
        &AtomicBool::new(false),
    )
    .await;

    assert!(matches!(outcome, FilterOutcome::Completed(s) if s.direct_files == 0));
    assert!(logs_contain("Invalid regular expression"));
}

#[tokio::test]
#[traced_test]
async fn test_unreadable_folder_is_logged_and_treated_as_empty() {
    if helpers::running_as_root() {
        return;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let harness = helpers::TestHarness::new();
        let locked = harness.root_path.join("locked");
        context_creator::utils::test_helpers::create_file(&locked, "secret.txt", "hello");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let mut tree = FolderTree::open(&harness.root_path).unwrap();
        let id = tree.find(&locked).unwrap();
        tree.expand(id);
        let node = tree.node(id).unwrap();
        let (loaded, has_children) = (node.is_loaded(), node.has_children());

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(loaded);
        assert!(!has_children);
        assert!(logs_contain("Error loading folder"));
    }
}
