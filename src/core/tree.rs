//! The lazily-loaded folder/file tree.
//!
//! Nodes live in a flat `SlotMap` arena. Folders keep ordered `NodeId` lists for their
//! child folders and files, and every node keeps the `NodeId` of its parent, so upward
//! walks never need an owning back-pointer. Children are enumerated from disk the first
//! time a folder is loaded or expanded; the tree never watches the filesystem afterwards.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::CoreError;

new_key_type! {
    /// Opaque, generation-checked handle to a node in a [`FolderTree`].
    pub struct NodeId;
}

/// How a node relates to the most recent filter pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    None,
    /// The node's own name or content satisfies the filter.
    Direct,
    /// A folder that is not a direct match but has one somewhere below it.
    Ancestor,
}

/// The property of a node that a mutation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChange {
    Selected,
    Expanded,
    Loaded,
    Match,
}

/// Receives a callback for every node mutation that actually changed a value.
///
/// A GUI host implements this to refresh individual rows; the application layer in
/// this crate pushes whole snapshots instead and does not install one.
pub trait TreeObserver: Send + Sync {
    fn node_changed(&self, id: NodeId, change: NodeChange);
}

#[derive(Debug, Clone, Default)]
pub struct FolderData {
    pub(crate) folders: Vec<NodeId>,
    pub(crate) files: Vec<NodeId>,
    pub(crate) is_loaded: bool,
    pub(crate) is_expanded: bool,
}

#[derive(Debug, Clone)]
pub struct FileData {
    pub(crate) size: u64,
    pub(crate) modified: Option<DateTime<Local>>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Folder(FolderData),
    File(FileData),
}

/// A single folder or file in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) parent: Option<NodeId>,
    pub(crate) is_selected: bool,
    pub(crate) match_type: MatchType,
    pub(crate) kind: NodeKind,
}

impl Node {
    fn new_folder(name: String, path: PathBuf, parent: Option<NodeId>, is_selected: bool) -> Self {
        Self {
            name,
            path,
            parent,
            is_selected,
            match_type: MatchType::None,
            kind: NodeKind::Folder(FolderData::default()),
        }
    }

    fn new_file(entry: FileEntry, parent: NodeId, is_selected: bool) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            parent: Some(parent),
            is_selected,
            match_type: MatchType::None,
            kind: NodeKind::File(FileData {
                size: entry.size,
                modified: entry.modified,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    /// `true` for both direct and ancestor matches.
    pub fn is_match(&self) -> bool {
        self.match_type != MatchType::None
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Byte size captured when the file node was created. `None` for folders.
    pub fn size(&self) -> Option<u64> {
        match &self.kind {
            NodeKind::File(file) => Some(file.size),
            NodeKind::Folder(_) => None,
        }
    }

    pub fn modified(&self) -> Option<DateTime<Local>> {
        match &self.kind {
            NodeKind::File(file) => file.modified,
            NodeKind::Folder(_) => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(&self.kind, NodeKind::Folder(folder) if folder.is_loaded)
    }

    pub fn is_expanded(&self) -> bool {
        matches!(&self.kind, NodeKind::Folder(folder) if folder.is_expanded)
    }

    /// Child folders in display order. Empty for files and unloaded folders.
    pub fn folders(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Folder(folder) => &folder.folders,
            NodeKind::File(_) => &[],
        }
    }

    /// Child files in display order. Empty for files and unloaded folders.
    pub fn files(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Folder(folder) => &folder.files,
            NodeKind::File(_) => &[],
        }
    }

    pub fn has_children(&self) -> bool {
        !self.folders().is_empty() || !self.files().is_empty()
    }
}

/// Names and sizes of a folder's direct children, for the preview pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSummary {
    pub path: PathBuf,
    pub folder_names: Vec<String>,
    pub files: Vec<(String, u64)>,
}

struct FileEntry {
    name: String,
    path: PathBuf,
    size: u64,
    modified: Option<DateTime<Local>>,
}

struct DirEntries {
    folders: Vec<(String, PathBuf)>,
    files: Vec<FileEntry>,
}

/// An in-memory view of the filesystem subtree below a user-chosen root folder.
pub struct FolderTree {
    arena: SlotMap<NodeId, Node>,
    root: NodeId,
    path_index: HashMap<PathBuf, NodeId>,
    observer: Option<Box<dyn TreeObserver>>,
}

impl FolderTree {
    /// Opens `root_path` as the root of a new tree.
    ///
    /// The root is loaded and expanded immediately. Fails only if the path is not an
    /// accessible directory; everything below the root is loaded fail-soft.
    pub fn open(root_path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let root_path = root_path.as_ref();
        let absolute =
            std::path::absolute(root_path).map_err(|e| CoreError::Io(e, root_path.to_path_buf()))?;
        let metadata = fs::metadata(&absolute).map_err(|e| CoreError::Io(e, absolute.clone()))?;
        if !metadata.is_dir() {
            return Err(CoreError::NotADirectory(absolute));
        }

        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| absolute.display().to_string());

        let mut arena = SlotMap::with_key();
        let root = arena.insert(Node::new_folder(name, absolute.clone(), None, false));
        let mut path_index = HashMap::new();
        path_index.insert(absolute.clone(), root);

        let mut tree = Self {
            arena,
            root,
            path_index,
            observer: None,
        };
        tree.expand(root);
        tracing::info!("Opened folder tree at {}", absolute.display());
        Ok(tree)
    }

    pub fn set_observer(&mut self, observer: Box<dyn TreeObserver>) {
        self.observer = Some(observer);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_path(&self) -> &Path {
        &self.arena[self.root].path
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    /// Number of materialized nodes, including the root.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Looks up a materialized node by its absolute path.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.path_index.get(path).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|node| node.parent)
    }

    /// Strict ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            result.push(parent);
            current = self.parent(parent);
        }
        result
    }

    /// All materialized nodes below `id` (excluding `id`), in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.arena.get(current) else {
                continue;
            };
            if current != id {
                result.push(current);
            }
            // Reverse push keeps files-then-folders display order when popping.
            stack.extend(node.folders().iter().rev().copied());
            stack.extend(node.files().iter().rev().copied());
        }
        result
    }

    pub(crate) fn child_ids(&self, id: NodeId) -> (Vec<NodeId>, Vec<NodeId>) {
        self.arena
            .get(id)
            .map(|node| (node.files().to_vec(), node.folders().to_vec()))
            .unwrap_or_default()
    }

    fn notify(&self, id: NodeId, change: NodeChange) {
        if let Some(observer) = &self.observer {
            observer.node_changed(id, change);
        }
    }

    /// Enumerates the immediate children of `folder` from disk, once.
    ///
    /// Returns `true` if a load happened. An unreadable folder is logged and treated as
    /// empty; it still counts as loaded so the failure is not retried on every access.
    pub fn load_children(&mut self, folder: NodeId) -> bool {
        let (path, inherit_selection) = match self.arena.get(folder) {
            Some(node) => match &node.kind {
                NodeKind::Folder(data) if !data.is_loaded => (node.path.clone(), node.is_selected),
                _ => return false,
            },
            None => return false,
        };

        let entries = match read_dir_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Error loading folder {}: {}", path.display(), e);
                DirEntries {
                    folders: Vec::new(),
                    files: Vec::new(),
                }
            }
        };

        let mut folder_ids = Vec::with_capacity(entries.folders.len());
        for (name, child_path) in entries.folders {
            let id = self.arena.insert(Node::new_folder(
                name,
                child_path.clone(),
                Some(folder),
                inherit_selection,
            ));
            self.path_index.insert(child_path, id);
            folder_ids.push(id);
        }

        let mut file_ids = Vec::with_capacity(entries.files.len());
        for entry in entries.files {
            let child_path = entry.path.clone();
            let id = self
                .arena
                .insert(Node::new_file(entry, folder, inherit_selection));
            self.path_index.insert(child_path, id);
            file_ids.push(id);
        }

        tracing::debug!(
            "Loaded {} folders and {} files from {}",
            folder_ids.len(),
            file_ids.len(),
            path.display()
        );

        if let Some(NodeKind::Folder(data)) = self.arena.get_mut(folder).map(|n| &mut n.kind) {
            data.folders = folder_ids;
            data.files = file_ids;
            data.is_loaded = true;
        }
        self.notify(folder, NodeChange::Loaded);
        true
    }

    fn set_expanded_flag(&mut self, id: NodeId, value: bool) -> bool {
        let changed = match self.arena.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Folder(data)) if data.is_expanded != value => {
                data.is_expanded = value;
                true
            }
            _ => false,
        };
        if changed {
            self.notify(id, NodeChange::Expanded);
        }
        changed
    }

    /// Marks a folder expanded, loading its children first if needed.
    pub fn expand(&mut self, folder: NodeId) -> bool {
        self.load_children(folder);
        self.set_expanded_flag(folder, true)
    }

    pub fn collapse(&mut self, folder: NodeId) -> bool {
        self.set_expanded_flag(folder, false)
    }

    pub fn toggle_expansion(&mut self, folder: NodeId) -> bool {
        match self.arena.get(folder) {
            Some(node) if node.is_folder() => {
                if node.is_expanded() {
                    self.collapse(folder)
                } else {
                    self.expand(folder)
                }
            }
            _ => false,
        }
    }

    /// Collapses every folder below `folder`. `folder` itself keeps its state.
    pub fn collapse_all(&mut self, folder: NodeId) {
        for id in self.descendants(folder) {
            self.set_expanded_flag(id, false);
        }
        if folder == self.root {
            self.set_expanded_flag(folder, true);
        }
    }

    /// Loads and expands every folder in the tree.
    pub fn expand_all(&mut self) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            self.expand(id);
            if let Some(node) = self.arena.get(id) {
                stack.extend(node.folders().iter().copied());
            }
        }
    }

    /// Sets the match classification; returns whether it changed.
    pub fn set_match_type(&mut self, id: NodeId, match_type: MatchType) -> bool {
        let changed = match self.arena.get_mut(id) {
            Some(node) if node.match_type != match_type => {
                node.match_type = match_type;
                true
            }
            _ => false,
        };
        if changed {
            self.notify(id, NodeChange::Match);
        }
        changed
    }

    /// Boolean view over [`MatchType`]: `true` means `Direct`, `false` means `None`.
    pub fn set_is_match(&mut self, id: NodeId, value: bool) -> bool {
        let match_type = if value {
            MatchType::Direct
        } else {
            MatchType::None
        };
        self.set_match_type(id, match_type)
    }

    /// Sets only this node's flag, without touching relatives.
    pub(crate) fn set_selected_flag(&mut self, id: NodeId, value: bool) -> bool {
        let changed = match self.arena.get_mut(id) {
            Some(node) if node.is_selected != value => {
                node.is_selected = value;
                true
            }
            _ => false,
        };
        if changed {
            self.notify(id, NodeChange::Selected);
        }
        changed
    }

    /// Collects the paths of all selected files, files of a folder before its subfolders.
    ///
    /// A selected folder that has not been loaded yet is loaded first, since all of its
    /// files are implicitly selected.
    pub fn selected_file_paths(&mut self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let needs_load = self
                .arena
                .get(id)
                .is_some_and(|node| node.is_selected && node.is_folder() && !node.is_loaded());
            if needs_load {
                self.load_children(id);
            }
            let (files, folders) = self.child_ids(id);
            paths.extend(
                files
                    .iter()
                    .filter_map(|f| self.arena.get(*f))
                    .filter(|node| node.is_selected)
                    .map(|node| node.path.clone()),
            );
            stack.extend(folders.into_iter().rev());
        }
        paths
    }

    /// Loads `folder` if necessary and describes its direct children.
    pub fn folder_summary(&mut self, folder: NodeId) -> Option<FolderSummary> {
        if !self.arena.get(folder)?.is_folder() {
            return None;
        }
        self.load_children(folder);
        let node = self.arena.get(folder)?;
        Some(FolderSummary {
            path: node.path.clone(),
            folder_names: node
                .folders()
                .iter()
                .filter_map(|id| self.arena.get(*id))
                .map(|n| n.name.clone())
                .collect(),
            files: node
                .files()
                .iter()
                .filter_map(|id| self.arena.get(*id))
                .map(|n| (n.name.clone(), n.size().unwrap_or(0)))
                .collect(),
        })
    }
}

/// Reads the immediate children of `path`, split into folders and files and sorted.
///
/// Entries whose metadata cannot be read are skipped. Symlinked directories are not
/// followed, so whole-tree walks cannot loop.
fn read_dir_entries(path: &Path) -> io::Result<DirEntries> {
    let mut folders = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", path.display(), e);
                continue;
            }
        };
        let child_path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let is_symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
        let metadata = match fs::metadata(&child_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", child_path.display(), e);
                continue;
            }
        };

        if metadata.is_dir() {
            if is_symlink {
                tracing::debug!("Not following directory symlink {}", child_path.display());
                continue;
            }
            folders.push((name, child_path));
        } else {
            files.push(FileEntry {
                name,
                path: child_path,
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
            });
        }
    }

    folders.sort_by(|a, b| compare_names(&a.0, &b.0));
    files.sort_by(|a, b| compare_names(&a.name, &b.name));
    Ok(DirEntries { folders, files })
}

fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::{create_dir, create_file, create_hello_project, setup_test_logging};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn names(tree: &FolderTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| tree.node(*id).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_open_loads_and_expands_root_only() {
        setup_test_logging();
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());

        let tree = FolderTree::open(&root_path).unwrap();
        let root = tree.node(tree.root()).unwrap();

        assert!(root.is_loaded());
        assert!(root.is_expanded());
        assert_eq!(names(&tree, root.files()), vec!["a.txt", "b.log"]);
        assert_eq!(names(&tree, root.folders()), vec!["sub"]);

        let sub = tree.node(root.folders()[0]).unwrap();
        assert!(!sub.is_loaded(), "subfolders are loaded lazily");
        assert!(sub.files().is_empty());
        // root, a.txt, b.log, sub
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_open_rejects_files_and_missing_paths() {
        let temp = TempDir::new().unwrap();
        let file = create_file(temp.path(), "plain.txt", "x");

        assert!(matches!(
            FolderTree::open(&file),
            Err(CoreError::NotADirectory(_))
        ));
        assert!(matches!(
            FolderTree::open(temp.path().join("missing")),
            Err(CoreError::Io(_, _))
        ));
    }

    #[test]
    fn test_children_are_sorted_case_insensitively() {
        let temp = TempDir::new().unwrap();
        create_file(temp.path(), "beta.txt", "");
        create_file(temp.path(), "Alpha.txt", "");
        create_file(temp.path(), "gamma.txt", "");
        create_dir(temp.path(), "zeta");
        create_dir(temp.path(), "Eta");

        let tree = FolderTree::open(temp.path()).unwrap();
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(
            names(&tree, root.files()),
            vec!["Alpha.txt", "beta.txt", "gamma.txt"]
        );
        assert_eq!(names(&tree, root.folders()), vec!["Eta", "zeta"]);
    }

    #[test]
    fn test_file_metadata_is_captured() {
        let temp = TempDir::new().unwrap();
        create_file(temp.path(), "data.txt", "12345");

        let tree = FolderTree::open(temp.path()).unwrap();
        let id = tree.find(&tree.root_path().join("data.txt")).unwrap();
        let node = tree.node(id).unwrap();
        assert_eq!(node.size(), Some(5));
        assert!(node.modified().is_some());
        assert_eq!(node.parent(), Some(tree.root()));
    }

    #[test]
    fn test_expand_loads_once() {
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());
        let mut tree = FolderTree::open(&root_path).unwrap();
        let sub = tree.find(&root_path.join("sub")).unwrap();

        assert!(tree.expand(sub));
        assert_eq!(tree.len(), 5);

        // New files on disk are not picked up by a second load.
        create_file(&root_path, "sub/late.txt", "");
        assert!(!tree.load_children(sub));
        tree.collapse(sub);
        tree.expand(sub);
        assert_eq!(tree.len(), 5);
        assert!(tree.find(&root_path.join("sub/late.txt")).is_none());
    }

    #[test]
    fn test_collapse_all_keeps_root_expanded() {
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());
        create_file(&root_path, "sub/deeper/d.txt", "");
        let mut tree = FolderTree::open(&root_path).unwrap();
        tree.expand_all();

        let sub = tree.find(&root_path.join("sub")).unwrap();
        let deeper = tree.find(&root_path.join("sub/deeper")).unwrap();
        assert!(tree.node(deeper).unwrap().is_expanded());

        tree.collapse_all(tree.root());
        assert!(tree.node(tree.root()).unwrap().is_expanded());
        assert!(!tree.node(sub).unwrap().is_expanded());
        assert!(!tree.node(deeper).unwrap().is_expanded());
        // Collapsing does not unload.
        assert!(tree.node(deeper).unwrap().is_loaded());
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());
        let mut tree = FolderTree::open(&root_path).unwrap();
        tree.expand_all();

        let c = tree.find(&root_path.join("sub/c.txt")).unwrap();
        let sub = tree.find(&root_path.join("sub")).unwrap();
        assert_eq!(tree.ancestors(c), vec![sub, tree.root()]);
        assert!(tree.ancestors(tree.root()).is_empty());

        let all = tree.descendants(tree.root());
        assert_eq!(
            names(&tree, &all),
            vec!["a.txt", "b.log", "sub", "c.txt"]
        );
    }

    #[test]
    fn test_is_match_maps_to_match_type() {
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());
        let mut tree = FolderTree::open(&root_path).unwrap();
        let a = tree.find(&root_path.join("a.txt")).unwrap();

        assert!(tree.set_is_match(a, true));
        assert_eq!(tree.node(a).unwrap().match_type(), MatchType::Direct);
        assert!(!tree.set_is_match(a, true), "unchanged value reports false");
        assert!(tree.set_is_match(a, false));
        assert_eq!(tree.node(a).unwrap().match_type(), MatchType::None);
        assert!(!tree.node(a).unwrap().is_match());
    }

    #[test]
    fn test_loaded_children_inherit_folder_selection() {
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());
        let mut tree = FolderTree::open(&root_path).unwrap();
        let sub = tree.find(&root_path.join("sub")).unwrap();

        tree.set_selected_flag(sub, true);
        tree.expand(sub);
        let c = tree.find(&root_path.join("sub/c.txt")).unwrap();
        assert!(tree.node(c).unwrap().is_selected());
    }

    #[test]
    fn test_selected_file_paths_loads_selected_folders() {
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());
        let mut tree = FolderTree::open(&root_path).unwrap();
        let a = tree.find(&root_path.join("a.txt")).unwrap();
        let sub = tree.find(&root_path.join("sub")).unwrap();

        tree.set_selected_flag(a, true);
        tree.set_selected_flag(sub, true);
        let paths = tree.selected_file_paths();
        assert_eq!(
            paths,
            vec![root_path.join("a.txt"), root_path.join("sub").join("c.txt")]
        );
    }

    #[test]
    fn test_folder_summary_lists_children() {
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());
        let mut tree = FolderTree::open(&root_path).unwrap();

        let summary = tree.folder_summary(tree.root()).unwrap();
        assert_eq!(summary.folder_names, vec!["sub".to_string()]);
        assert_eq!(
            summary.files,
            vec![("a.txt".to_string(), 11), ("b.log".to_string(), 7)]
        );

        let a = tree.find(&root_path.join("a.txt")).unwrap();
        assert!(tree.folder_summary(a).is_none());
    }

    #[derive(Clone, Default)]
    struct RecordingObserver {
        changes: Arc<Mutex<Vec<(NodeId, NodeChange)>>>,
    }

    impl TreeObserver for RecordingObserver {
        fn node_changed(&self, id: NodeId, change: NodeChange) {
            self.changes.lock().unwrap().push((id, change));
        }
    }

    #[test]
    fn test_observer_sees_only_real_changes() {
        let temp = TempDir::new().unwrap();
        let root_path = create_hello_project(temp.path());
        let mut tree = FolderTree::open(&root_path).unwrap();
        let observer = RecordingObserver::default();
        tree.set_observer(Box::new(observer.clone()));

        let sub = tree.find(&root_path.join("sub")).unwrap();
        tree.expand(sub);
        tree.expand(sub);
        tree.set_match_type(sub, MatchType::Ancestor);

        let changes = observer.changes.lock().unwrap().clone();
        assert_eq!(
            changes,
            vec![
                (sub, NodeChange::Loaded),
                (sub, NodeChange::Expanded),
                (sub, NodeChange::Match)
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_folder_is_treated_as_empty() {
        use crate::utils::test_helpers::running_as_root;
        use std::os::unix::fs::PermissionsExt;

        if running_as_root() {
            return;
        }
        setup_test_logging();
        let temp = TempDir::new().unwrap();
        let locked = create_dir(temp.path(), "locked");
        create_file(&locked, "secret.txt", "x");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let mut tree = FolderTree::open(temp.path()).unwrap();
        let id = tree.find(&tree.root_path().join("locked")).unwrap();
        tree.expand(id);

        let node = tree.node(id).unwrap();
        assert!(node.is_loaded());
        assert!(!node.has_children());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
