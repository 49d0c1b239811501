//! Classifies every node of a [`FolderTree`] against a [`FilterCriteria`].
//!
//! The pass runs in four steps:
//!
//! 1. every node is reset to [`MatchType::None`];
//! 2. folders are evaluated children-first. Files become `Direct` when the include/exclude
//!    predicate holds. In file-name mode a folder's own name can make it `Direct`;
//!    otherwise a folder with a matching child becomes `Ancestor`;
//! 3. every ancestor of a `Direct` node that is not itself `Direct` becomes `Ancestor`;
//! 4. all matching folders are expanded so the matches are visible.
//!
//! Unreadable folders and files, oversized or binary files and invalid regular
//! expressions are logged and count as non-matching. The pass always ends with a fully
//! classified tree, or a fully cleared one if it was cancelled.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::matcher::TextMatcher;
use super::tree::{FolderTree, MatchType, NodeId};
use crate::utils::file_detection::is_content_searchable;

/// Shared flag checked by long-running operations between files.
pub type CancellationFlag = Arc<AtomicBool>;

/// What the filter expression is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterTarget {
    FileName,
    #[default]
    Content,
}

/// Whether matching files are the result (`Include`) or everything else is (`Exclude`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterAction {
    #[default]
    Include,
    Exclude,
}

impl FilterAction {
    /// Maps a raw comparison result to "is this node a direct match".
    pub fn applies(self, raw_match: bool) -> bool {
        match self {
            FilterAction::Include => raw_match,
            FilterAction::Exclude => !raw_match,
        }
    }
}

/// Options for one filter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub target: FilterTarget,
    pub expression: String,
    pub is_case_sensitive: bool,
    pub is_regex: bool,
    pub exact_match: bool,
    pub action: FilterAction,
    pub apply_to_selected_folders_only: bool,
}

impl FilterCriteria {
    pub fn file_name(expression: impl Into<String>) -> Self {
        Self {
            target: FilterTarget::FileName,
            expression: expression.into(),
            ..Default::default()
        }
    }

    pub fn content(expression: impl Into<String>) -> Self {
        Self {
            target: FilterTarget::Content,
            expression: expression.into(),
            ..Default::default()
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.is_case_sensitive = true;
        self
    }

    pub fn regex(mut self) -> Self {
        self.is_regex = true;
        self
    }

    pub fn exact(mut self) -> Self {
        self.exact_match = true;
        self
    }

    pub fn exclude(mut self) -> Self {
        self.action = FilterAction::Exclude;
        self
    }

    pub fn selected_folders_only(mut self) -> Self {
        self.apply_to_selected_folders_only = true;
        self
    }
}

/// Match counts after a completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FilterSummary {
    pub direct_files: usize,
    pub direct_folders: usize,
    pub ancestor_folders: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Completed(FilterSummary),
    /// The pass was interrupted; all match state has been cleared.
    Cancelled,
}

impl FolderTree {
    /// Resets every node's match classification to `None`.
    pub fn clear_filters(&mut self) {
        let root = self.root();
        self.set_match_type(root, MatchType::None);
        for id in self.descendants(root) {
            self.set_match_type(id, MatchType::None);
        }
    }

    /// Counts direct and ancestor matches over the materialized tree.
    pub fn match_summary(&self) -> FilterSummary {
        let root = self.root();
        let mut summary = FilterSummary::default();
        for id in std::iter::once(root).chain(self.descendants(root)) {
            let Some(node) = self.node(id) else {
                continue;
            };
            match (node.match_type(), node.is_folder()) {
                (MatchType::Direct, false) => summary.direct_files += 1,
                (MatchType::Direct, true) => summary.direct_folders += 1,
                (MatchType::Ancestor, true) => summary.ancestor_folders += 1,
                _ => {}
            }
        }
        summary
    }
}

/// A utility struct for running filter passes over a tree.
///
/// This struct is stateless and provides methods as associated functions.
pub struct FilterEngine;

impl FilterEngine {
    /// Runs a complete filter pass over `tree`.
    ///
    /// Content reads happen one file at a time, yielding to the runtime after each read.
    /// `cancel` is checked before every file; when set, the tree's matches are cleared
    /// and [`FilterOutcome::Cancelled`] is returned.
    pub async fn apply_filter(
        tree: &mut FolderTree,
        criteria: &FilterCriteria,
        cancel: &AtomicBool,
    ) -> FilterOutcome {
        tracing::info!(
            "Applying {:?} filter {:?} ({:?}) to {}",
            criteria.target,
            criteria.expression,
            criteria.action,
            tree.root_path().display()
        );

        let matcher = TextMatcher::new(criteria).unwrap_or_else(|e| {
            tracing::error!("{}; treating every comparison as a non-match", e);
            TextMatcher::never()
        });

        tree.clear_filters();

        for folder in Self::folders_children_first(tree) {
            if cancel.load(Ordering::Relaxed) {
                return Self::cancelled(tree);
            }
            if !Self::evaluate_folder(tree, folder, criteria, &matcher, cancel).await {
                return Self::cancelled(tree);
            }
        }

        Self::propagate_to_ancestors(tree);
        Self::expand_matches(tree);

        let summary = tree.match_summary();
        tracing::info!(
            "Filter complete: {} files, {} folders direct; {} ancestor folders",
            summary.direct_files,
            summary.direct_folders,
            summary.ancestor_folders
        );
        FilterOutcome::Completed(summary)
    }

    fn cancelled(tree: &mut FolderTree) -> FilterOutcome {
        tracing::info!("Filter pass cancelled; clearing partial results");
        tree.clear_filters();
        FilterOutcome::Cancelled
    }

    /// Loads the whole subtree and returns its folders so that every folder comes after
    /// all of its descendants.
    fn folders_children_first(tree: &mut FolderTree) -> Vec<NodeId> {
        let mut pre_order = Vec::new();
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            tree.load_children(id);
            pre_order.push(id);
            if let Some(node) = tree.node(id) {
                stack.extend(node.folders().iter().rev().copied());
            }
        }
        pre_order.reverse();
        pre_order
    }

    /// Classifies a folder's files and the folder itself. Returns `false` if the pass
    /// was cancelled while reading files.
    async fn evaluate_folder(
        tree: &mut FolderTree,
        folder: NodeId,
        criteria: &FilterCriteria,
        matcher: &TextMatcher,
        cancel: &AtomicBool,
    ) -> bool {
        let Some(node) = tree.node(folder) else {
            return true;
        };
        let evaluate_own = !criteria.apply_to_selected_folders_only || node.is_selected();
        let folder_name = node.name().to_string();
        let (files, sub_folders) = (node.files().to_vec(), node.folders().to_vec());

        let mut has_direct_file = false;
        if evaluate_own {
            for file in files {
                if cancel.load(Ordering::Relaxed) {
                    return false;
                }
                if let Some(raw_match) = Self::raw_file_match(tree, file, criteria, matcher).await
                {
                    if criteria.action.applies(raw_match) {
                        tree.set_match_type(file, MatchType::Direct);
                        has_direct_file = true;
                    }
                }
            }
        } else {
            tracing::debug!("Skipping unselected folder {}", folder_name);
        }

        let own_name_matches = evaluate_own
            && criteria.target == FilterTarget::FileName
            && criteria.action.applies(matcher.is_match(&folder_name));

        let has_matching_sub_folder = sub_folders
            .iter()
            .filter_map(|id| tree.node(*id))
            .any(|n| n.match_type() != MatchType::None);

        if own_name_matches {
            tree.set_match_type(folder, MatchType::Direct);
        } else if has_direct_file || has_matching_sub_folder {
            tree.set_match_type(folder, MatchType::Ancestor);
        }
        true
    }

    /// Compares one file against the expression. `None` means the file could not be
    /// compared (binary, too large, unreadable) and stays unclassified.
    async fn raw_file_match(
        tree: &FolderTree,
        file: NodeId,
        criteria: &FilterCriteria,
        matcher: &TextMatcher,
    ) -> Option<bool> {
        let node = tree.node(file)?;
        match criteria.target {
            FilterTarget::FileName => Some(matcher.is_match(node.name())),
            FilterTarget::Content => {
                let size = node.size().unwrap_or(0);
                if !is_content_searchable(node.path(), size) {
                    tracing::debug!("Skipping content of {}", node.path().display());
                    return None;
                }
                let path = node.path().to_path_buf();
                let result = match tokio::fs::read(&path).await {
                    Ok(bytes) => Some(matcher.is_match(&String::from_utf8_lossy(&bytes))),
                    Err(e) => {
                        tracing::warn!("Error reading file {}: {}", path.display(), e);
                        None
                    }
                };
                tokio::task::yield_now().await;
                result
            }
        }
    }

    /// Marks every non-direct ancestor of a direct match as `Ancestor`.
    fn propagate_to_ancestors(tree: &mut FolderTree) {
        let root = tree.root();
        let direct: Vec<NodeId> = std::iter::once(root)
            .chain(tree.descendants(root))
            .filter(|id| tree.node(*id).map(|n| n.match_type()) == Some(MatchType::Direct))
            .collect();

        for id in direct {
            for ancestor in tree.ancestors(id) {
                if tree.node(ancestor).map(|n| n.match_type()) != Some(MatchType::Direct) {
                    tree.set_match_type(ancestor, MatchType::Ancestor);
                }
            }
        }
    }

    fn expand_matches(tree: &mut FolderTree) {
        let root = tree.root();
        let matching_folders: Vec<NodeId> = std::iter::once(root)
            .chain(tree.descendants(root))
            .filter(|id| tree.node(*id).is_some_and(|n| n.is_folder() && n.is_match()))
            .collect();
        for id in matching_folders {
            tree.expand(id);
        }
    }
}
