//! Selection propagation over a [`FolderTree`].
//!
//! Selection is a plain boolean per node. A folder is selected iff every direct child
//! is selected; when the children are mixed the folder is treated as not selected.
//! Folders without children keep whatever value they had, since there is nothing to
//! decide by.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use super::tree::{FolderTree, NodeId};

impl FolderTree {
    /// Sets the selection of `id` and all of its materialized descendants, then
    /// re-synchronizes its ancestors. Returns `true` if any node changed.
    pub fn set_selected(&mut self, id: NodeId, value: bool) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        let mut changed = self.set_selected_flag(id, value);
        for descendant in self.descendants(id) {
            changed |= self.set_selected_flag(descendant, value);
        }
        changed |= self.propagate_upward(id);
        changed
    }

    pub fn toggle_selection(&mut self, id: NodeId) -> bool {
        match self.node(id).map(|n| n.is_selected()) {
            Some(current) => self.set_selected(id, !current),
            None => false,
        }
    }

    pub fn select_all(&mut self) -> bool {
        self.set_selected(self.root(), true)
    }

    pub fn deselect_all(&mut self) -> bool {
        self.set_selected(self.root(), false)
    }

    /// Recomputes every ancestor of `id`, nearest first, up to the root.
    pub fn propagate_upward(&mut self, id: NodeId) -> bool {
        let mut changed = false;
        for ancestor in self.ancestors(id) {
            changed |= self.recompute_folder_selection(ancestor);
        }
        changed
    }

    /// Applies the all-children rule to a single folder.
    fn recompute_folder_selection(&mut self, folder: NodeId) -> bool {
        let (files, folders) = self.child_ids(folder);
        if files.is_empty() && folders.is_empty() {
            return false;
        }
        let all_selected = files
            .iter()
            .chain(folders.iter())
            .all(|child| self.node(*child).is_some_and(|n| n.is_selected()));
        self.set_selected_flag(folder, all_selected)
    }

    /// Flips every file below `folder` and recomputes the folders bottom-up.
    ///
    /// A folder that has never been loaded stands in for all of its files, so its own
    /// flag is flipped.
    pub fn invert_selection(&mut self, folder: NodeId) {
        let Some(node) = self.node(folder) else {
            return;
        };
        if !node.is_folder() {
            let current = node.is_selected();
            self.set_selected_flag(folder, !current);
            return;
        }
        if !node.is_loaded() {
            let current = node.is_selected();
            self.set_selected_flag(folder, !current);
            return;
        }

        let (files, folders) = self.child_ids(folder);
        for file in files {
            if let Some(current) = self.node(file).map(|n| n.is_selected()) {
                self.set_selected_flag(file, !current);
            }
        }
        for sub in folders {
            self.invert_selection(sub);
        }
        self.recompute_folder_selection(folder);
    }

    /// Selects exactly the files whose paths are in `paths`.
    ///
    /// Paths are compared after normalization, case-insensitively. Unloaded folders that
    /// contain one of the paths are loaded first. An unloaded folder whose own path is
    /// listed is selected as a whole.
    pub fn apply_selection<P: AsRef<Path>>(&mut self, folder: NodeId, paths: &[P]) {
        let normalized: Vec<PathBuf> = paths.iter().map(|p| normalize_path(p.as_ref())).collect();
        let wanted: HashSet<String> = normalized.iter().map(|p| path_key(p)).collect();
        let containing_dirs: HashSet<String> = normalized
            .iter()
            .flat_map(|p| p.ancestors().skip(1).map(path_key).collect::<Vec<_>>())
            .collect();

        self.load_folders_for_paths(folder, &containing_dirs);
        self.apply_selection_recursive(folder, &wanted);
        self.propagate_upward(folder);
    }

    fn load_folders_for_paths(&mut self, folder: NodeId, containing_dirs: &HashSet<String>) {
        let mut stack = vec![folder];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !node.is_folder() {
                continue;
            }
            if !node.is_loaded() && containing_dirs.contains(&path_key(node.path())) {
                self.load_children(id);
            }
            let (_, folders) = self.child_ids(id);
            stack.extend(folders);
        }
    }

    fn apply_selection_recursive(&mut self, folder: NodeId, wanted: &HashSet<String>) {
        let Some(node) = self.node(folder) else {
            return;
        };
        if !node.is_loaded() {
            let listed = wanted.contains(&path_key(node.path()));
            self.set_selected_flag(folder, listed);
            return;
        }

        let (files, folders) = self.child_ids(folder);
        for file in files {
            let listed = self
                .node(file)
                .is_some_and(|n| wanted.contains(&path_key(n.path())));
            self.set_selected_flag(file, listed);
        }
        for sub in folders {
            self.apply_selection_recursive(sub, wanted);
        }
        self.recompute_folder_selection(folder);
    }
}

/// Makes `path` absolute and resolves `.` and `..` lexically.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Comparison key for an already normalized path: lowercase with `/` separators.
fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}
