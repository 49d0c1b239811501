//! Contains the command handlers a host calls in response to user actions.
//!
//! Each function corresponds to an `IpcMessage::command`. Handlers mutate the
//! `AppState`, call into `core`, and report back through `UserEvent`s. Nodes are
//! addressed by absolute path so hosts never see arena handles.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::events::UserEvent;
use super::helpers::{lock_state, notify, with_state_and_notify};
use super::proxy::EventProxy;
use super::state::AppState;
use super::view_model::folder_preview_text;
use crate::core::{ContextConfiguration, CoreError, FolderTree, NodeId};

fn resolve_node(state: &AppState, path: &Path) -> Result<NodeId, CoreError> {
    let unknown = || CoreError::UnknownNode(path.to_path_buf());
    let tree = state.tree.as_ref().ok_or_else(unknown)?;
    let absolute = std::path::absolute(path).map_err(|e| CoreError::Io(e, path.to_path_buf()))?;
    tree.find(&absolute).ok_or_else(unknown)
}

/// Runs `action` on the node at `path` if the tree is available and contains it.
fn with_node<F, P: EventProxy>(state: &Arc<Mutex<AppState>>, proxy: &P, path: &Path, action: F)
where
    F: FnOnce(&mut FolderTree, NodeId),
{
    with_state_and_notify(state, proxy, |s| {
        if !s.tree_available() {
            return;
        }
        let id = match resolve_node(s, path) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("{}", e);
                return;
            }
        };
        if let Some(tree) = s.tree.as_mut() {
            action(tree, id);
        }
    });
}

/// Runs `action` on the whole tree, framing it with the given status messages.
fn with_tree<F, P: EventProxy>(
    state: &Arc<Mutex<AppState>>,
    proxy: &P,
    done_message: &str,
    action: F,
) where
    F: FnOnce(&mut FolderTree),
{
    with_state_and_notify(state, proxy, |s| {
        if !s.tree_available() {
            return;
        }
        if let Some(tree) = s.tree.as_mut() {
            action(tree);
            s.status_message = done_message.to_string();
        }
    });
}

/// Opens `path` as the root of a fresh session.
///
/// On failure the previous session is kept and the error is reported. Ignored while a
/// filter task owns the tree.
pub fn open_folder<P: EventProxy>(path: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    let mut s = lock_state(&state);
    if s.is_filtering {
        s.status_message = "Filter in progress".to_string();
        notify(&s, &proxy);
        return;
    }
    match FolderTree::open(&path) {
        Ok(tree) => {
            let root = tree.root_path().to_path_buf();
            s.reset_folder_state();
            s.tree = Some(tree);
            s.current_configuration = ContextConfiguration::for_root(&root);
            s.config.add_recent_folder(&root);
            s.persist_config();
            s.status_message = "Ready".to_string();
            tracing::info!("Opened folder {}", root.display());
        }
        Err(e) => {
            tracing::error!("Failed to open folder {}: {}", path.display(), e);
            s.status_message = format!("Error opening folder: {}", e);
            proxy.send_event(UserEvent::ShowError(s.status_message.clone()));
        }
    }
    notify(&s, &proxy);
}

/// Opens a folder from the recent list, if it still exists.
pub fn open_recent_folder<P: EventProxy>(path: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    if path.is_dir() {
        open_folder(path, proxy, state);
    } else {
        with_state_and_notify(&state, &proxy, |s| {
            s.status_message = format!("Folder no longer exists: {}", path.display());
        });
    }
}

/// Closes the open folder.
pub fn close_folder<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        if s.is_filtering {
            s.status_message = "Filter in progress".to_string();
            return;
        }
        s.reset_folder_state();
        s.status_message = "Ready".to_string();
    });
}

pub fn toggle_selection<P: EventProxy>(path: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    with_node(&state, &proxy, &path, |tree, id| {
        tree.toggle_selection(id);
    });
}

pub fn set_selection<P: EventProxy>(
    path: PathBuf,
    selected: bool,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    with_node(&state, &proxy, &path, |tree, id| {
        tree.set_selected(id, selected);
    });
}

pub fn toggle_expansion<P: EventProxy>(path: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    with_node(&state, &proxy, &path, |tree, id| {
        tree.toggle_expansion(id);
    });
}

pub fn select_all<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_tree(&state, &proxy, "All files selected", |tree| {
        tree.select_all();
    });
}

pub fn deselect_all<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_tree(&state, &proxy, "All files deselected", |tree| {
        tree.deselect_all();
    });
}

pub fn invert_selection<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_tree(&state, &proxy, "Selection inverted", |tree| {
        let root = tree.root();
        tree.invert_selection(root);
    });
}

pub fn collapse_all<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_tree(&state, &proxy, "All folders collapsed", |tree| {
        let root = tree.root();
        tree.collapse_all(root);
    });
}

pub fn expand_all<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_tree(&state, &proxy, "All folders expanded", |tree| tree.expand_all());
}

pub fn clear_filters<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        if !s.tree_available() {
            return;
        }
        if let Some(tree) = s.tree.as_mut() {
            tree.clear_filters();
        }
        s.last_filter_summary = None;
        s.status_message = "Filters cleared".to_string();
    });
}

/// Selects exactly the files that are direct matches of the last filter run.
pub fn select_matches<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_tree(&state, &proxy, "Matching files selected", |tree| {
        let root = tree.root();
        let matches: Vec<PathBuf> = tree
            .descendants(root)
            .into_iter()
            .filter_map(|id| tree.node(id))
            .filter(|node| node.is_file() && node.is_match())
            .map(|node| node.path().to_path_buf())
            .collect();
        tree.apply_selection(root, &matches);
    });
}

pub fn cancel_filter<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.cancel_current_filter());
}

pub fn cancel_export<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.cancel_current_export());
}

/// Shows a file's text, or a description of a folder, in the preview pane.
pub fn load_preview<P: EventProxy>(path: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    let mut s = lock_state(&state);
    if !s.tree_available() {
        notify(&s, &proxy);
        return;
    }
    let id = match resolve_node(&s, &path) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Cannot preview: {}", e);
            notify(&s, &proxy);
            return;
        }
    };
    let Some(tree) = s.tree.as_mut() else {
        notify(&s, &proxy);
        return;
    };

    let content = match tree.folder_summary(id) {
        Some(summary) => folder_preview_text(&summary),
        None => match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => format!("Error loading file: {}", e),
        },
    };
    s.previewed_path = Some(path.clone());
    proxy.send_event(UserEvent::ShowPreview { path, content });
    notify(&s, &proxy);
}

/// Renames the current configuration.
pub fn set_configuration_details<P: EventProxy>(
    name: String,
    description: String,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    with_state_and_notify(&state, &proxy, |s| {
        s.current_configuration.name = name;
        s.current_configuration.description = description;
    });
}

/// Stores the current root and selection in a `.ctx` file.
pub fn save_configuration<P: EventProxy>(path: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    let mut s = lock_state(&state);
    if !s.tree_available() {
        notify(&s, &proxy);
        return;
    }
    s.status_message = "Saving configuration...".to_string();

    let state_ref = &mut *s;
    if let Some(tree) = state_ref.tree.as_mut() {
        state_ref.current_configuration.capture(tree);
    }
    match state_ref.current_configuration.save_to_file(&path) {
        Ok(()) => {
            s.current_configuration_path = Some(path.clone());
            s.config.add_recent_configuration(&path);
            s.persist_config();
            s.status_message = "Configuration saved successfully".to_string();
            proxy.send_event(UserEvent::ConfigurationSaved(path));
        }
        Err(e) => {
            tracing::error!("Failed to save configuration: {}", e);
            s.status_message = format!("Error saving configuration: {}", e);
            proxy.send_event(UserEvent::ShowError(s.status_message.clone()));
        }
    }
    notify(&s, &proxy);
}

/// Loads a `.ctx` file, opens its root folder and restores its selection.
///
/// A file that cannot be read or parsed leaves the session untouched. A configuration
/// whose root folder no longer exists is adopted without opening a tree.
pub fn load_configuration<P: EventProxy>(path: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    let mut s = lock_state(&state);
    if s.is_filtering {
        s.status_message = "Filter in progress".to_string();
        notify(&s, &proxy);
        return;
    }
    s.status_message = "Loading configuration...".to_string();

    let configuration = match ContextConfiguration::load_from_file(&path) {
        Ok(configuration) => configuration,
        Err(e) => {
            tracing::error!("Failed to load configuration {}: {}", path.display(), e);
            s.status_message = format!("Error loading configuration: {}", e);
            proxy.send_event(UserEvent::ShowError(s.status_message.clone()));
            notify(&s, &proxy);
            return;
        }
    };

    let tree = match open_configured_root(&configuration) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::error!("Failed to open root of configuration {}: {}", path.display(), e);
            s.status_message = format!("Error loading configuration: {}", e);
            proxy.send_event(UserEvent::ShowError(s.status_message.clone()));
            notify(&s, &proxy);
            return;
        }
    };

    s.reset_folder_state();
    s.config.add_recent_folder(tree.root_path());
    s.tree = Some(tree);
    s.current_configuration = configuration;
    s.current_configuration_path = Some(path.clone());
    s.config.add_recent_configuration(&path);
    s.persist_config();
    s.status_message = "Configuration loaded successfully".to_string();
    notify(&s, &proxy);
}

/// Opens the configuration's root folder and restores its selection.
fn open_configured_root(configuration: &ContextConfiguration) -> Result<FolderTree> {
    let root = configuration.existing_root()?;
    let mut tree = FolderTree::open(root)?;
    configuration.restore(&mut tree);
    Ok(tree)
}
