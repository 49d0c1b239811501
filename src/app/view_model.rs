//! Responsible for transforming the `AppState` into a `UiState` view model.
//!
//! This module acts as a presentation layer, preparing data specifically for consumption
//! by the UI. It flattens the arena tree into nested, serializable nodes and derives
//! display-only properties such as the partial selection state.

use serde::Serialize;
use std::path::PathBuf;

use super::state::AppState;
use crate::config::AppConfig;
use crate::core::{
    FilterCriteria, FilterSummary, FolderSummary, FolderTree, MatchType, NodeId,
};

/// A serializable representation of the application state for the UI.
#[derive(Serialize, Clone, Debug)]
pub struct UiState {
    pub config: AppConfig,
    pub root_path: Option<PathBuf>,
    pub tree: Option<TreeNodeView>,
    pub status_message: String,
    pub is_filtering: bool,
    pub is_exporting: bool,
    pub filter: FilterCriteria,
    pub filter_summary: Option<FilterSummary>,
    pub configuration_name: String,
    pub configuration_path: Option<PathBuf>,
    /// Selected files among the nodes loaded so far.
    pub selected_files_count: usize,
    pub selected_files_size: u64,
    pub estimated_tokens: Option<usize>,
    pub previewed_path: Option<PathBuf>,
}

/// A serializable representation of a single node in the file tree for the UI.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TreeNodeView {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub size: u64,
    /// `"selected"`, `"partial"` or `"unselected"`. `"partial"` is derived for display
    /// only: an unselected folder with at least one selected file below it.
    pub selection_state: &'static str,
    pub is_expanded: bool,
    pub is_loaded: bool,
    pub match_type: MatchType,
    /// Children of expanded folders only.
    pub children: Vec<TreeNodeView>,
}

#[derive(Default)]
struct SelectionTally {
    files: usize,
    bytes: u64,
}

/// Creates the complete `UiState` from the current `AppState`.
pub fn generate_ui_state(state: &AppState) -> UiState {
    let mut tally = SelectionTally::default();
    let tree = state
        .tree
        .as_ref()
        .map(|tree| build_node(tree, tree.root(), &mut tally).0);

    UiState {
        config: state.config.clone(),
        root_path: state
            .tree
            .as_ref()
            .map(|t| t.root_path().to_path_buf())
            .or_else(|| {
                state
                    .is_filtering
                    .then(|| state.current_configuration.root_folder.clone())
            }),
        tree,
        status_message: state.status_message.clone(),
        is_filtering: state.is_filtering,
        is_exporting: state.is_exporting,
        filter: state.filter_criteria.clone(),
        filter_summary: state.last_filter_summary,
        configuration_name: state.current_configuration.name.clone(),
        configuration_path: state.current_configuration_path.clone(),
        selected_files_count: tally.files,
        selected_files_size: tally.bytes,
        estimated_tokens: state.estimated_tokens,
        previewed_path: state.previewed_path.clone(),
    }
}

/// Builds the view of `id`, returning it together with whether any file at or below
/// it is selected.
fn build_node(tree: &FolderTree, id: NodeId, tally: &mut SelectionTally) -> (TreeNodeView, bool) {
    let Some(node) = tree.node(id) else {
        return (empty_view(), false);
    };

    if node.is_file() {
        let size = node.size().unwrap_or(0);
        if node.is_selected() {
            tally.files += 1;
            tally.bytes += size;
        }
        let view = TreeNodeView {
            name: node.name().to_string(),
            path: node.path().to_path_buf(),
            is_directory: false,
            size,
            selection_state: selection_label(node.is_selected(), false),
            is_expanded: false,
            is_loaded: true,
            match_type: node.match_type(),
            children: Vec::new(),
        };
        return (view, node.is_selected());
    }

    let mut any_selected = false;
    let mut children = Vec::new();
    for child in node.folders().iter().chain(node.files()) {
        let (child_view, child_selected) = build_node(tree, *child, tally);
        any_selected |= child_selected;
        if node.is_expanded() {
            children.push(child_view);
        }
    }

    let view = TreeNodeView {
        name: node.name().to_string(),
        path: node.path().to_path_buf(),
        is_directory: true,
        size: 0,
        selection_state: selection_label(node.is_selected(), any_selected),
        is_expanded: node.is_expanded(),
        is_loaded: node.is_loaded(),
        match_type: node.match_type(),
        children,
    };
    (view, any_selected || node.is_selected())
}

fn selection_label(is_selected: bool, has_selected_descendant: bool) -> &'static str {
    match (is_selected, has_selected_descendant) {
        (true, _) => "selected",
        (false, true) => "partial",
        (false, false) => "unselected",
    }
}

fn empty_view() -> TreeNodeView {
    TreeNodeView {
        name: String::new(),
        path: PathBuf::new(),
        is_directory: false,
        size: 0,
        selection_state: "unselected",
        is_expanded: false,
        is_loaded: false,
        match_type: MatchType::None,
        children: Vec::new(),
    }
}

/// Formats a byte count with binary units and at most two decimals, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut len = bytes as f64;
    let mut order = 0;
    while len >= 1024.0 && order < UNITS.len() - 1 {
        order += 1;
        len /= 1024.0;
    }
    let formatted = format!("{:.2}", len);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[order])
}

/// The text shown in the preview pane for a folder.
pub fn folder_preview_text(summary: &FolderSummary) -> String {
    let mut text = format!("Folder: {}\n\n", summary.path.display());
    text.push_str(&format!("Subfolders: {}\n", summary.folder_names.len()));
    if !summary.folder_names.is_empty() {
        text.push_str("\nSubfolder List:\n");
        for name in &summary.folder_names {
            text.push_str(&format!("- {}\n", name));
        }
    }
    text.push_str(&format!("\nFiles: {}\n", summary.files.len()));
    if !summary.files.is_empty() {
        text.push_str("\nFile List:\n");
        for (name, size) in &summary.files {
            text.push_str(&format!("- {} ({})\n", name, format_file_size(*size)));
        }
    }
    text
}
