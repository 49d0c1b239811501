//! Saved context configurations (`.ctx` files): a root folder plus the files selected in it.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::tree::FolderTree;

pub const CONFIGURATION_EXTENSION: &str = "ctx";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Cannot access configuration file {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    #[error("Malformed configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Root folder does not exist: {0}")]
    MissingRootFolder(PathBuf),

    #[error("Configuration does not name a root folder")]
    EmptyRootFolder,
}

/// A named, persisted selection.
///
/// Every field falls back to its default when absent from the file, so older or
/// hand-edited configurations still load. Files written with PascalCase keys
/// (`RootFolder`, `SelectedPaths`, ...) are read as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextConfiguration {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Description")]
    pub description: String,
    #[serde(alias = "CreatedDate")]
    pub created_date: DateTime<Local>,
    #[serde(alias = "ModifiedDate")]
    pub modified_date: DateTime<Local>,
    #[serde(alias = "RootFolder")]
    pub root_folder: PathBuf,
    #[serde(alias = "SelectedPaths")]
    pub selected_paths: Vec<PathBuf>,
}

impl Default for ContextConfiguration {
    fn default() -> Self {
        let now = Local::now();
        Self {
            name: "Unnamed Configuration".to_string(),
            description: String::new(),
            created_date: now,
            modified_date: now,
            root_folder: PathBuf::new(),
            selected_paths: Vec::new(),
        }
    }
}

impl ContextConfiguration {
    pub fn for_root(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
            ..Default::default()
        }
    }

    /// Writes the configuration as indented JSON, stamping `modified_date` first.
    pub fn save_to_file(&mut self, path: &Path) -> Result<(), ConfigurationError> {
        self.modified_date = Local::now();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ConfigurationError::Io(e, path.to_path_buf()))?;
        tracing::info!("Saved configuration '{}' to {}", self.name, path.display());
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let json =
            fs::read_to_string(path).map_err(|e| ConfigurationError::Io(e, path.to_path_buf()))?;
        let config: Self = serde_json::from_str(&json)?;
        tracing::info!(
            "Loaded configuration '{}' ({} selected paths) from {}",
            config.name,
            config.selected_paths.len(),
            path.display()
        );
        Ok(config)
    }

    /// The root folder, if it names an existing directory.
    pub fn existing_root(&self) -> Result<&Path, ConfigurationError> {
        if self.root_folder.as_os_str().is_empty() {
            return Err(ConfigurationError::EmptyRootFolder);
        }
        if !self.root_folder.is_dir() {
            return Err(ConfigurationError::MissingRootFolder(self.root_folder.clone()));
        }
        Ok(&self.root_folder)
    }

    /// Replaces the stored root and selection with the tree's current state.
    pub fn capture(&mut self, tree: &mut FolderTree) {
        self.root_folder = tree.root_path().to_path_buf();
        self.selected_paths = tree.selected_file_paths();
    }

    /// Applies the stored selection to `tree`.
    pub fn restore(&self, tree: &mut FolderTree) {
        if self.selected_paths.is_empty() {
            return;
        }
        let root = tree.root();
        tree.apply_selection(root, &self.selected_paths);
    }
}
