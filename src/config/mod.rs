pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::ExportFormat;

/// Recent-item lists never grow beyond this many entries.
pub const MAX_RECENT_ITEMS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Most recently opened root folders, newest first.
    pub recent_folders: Vec<PathBuf>,
    /// Most recently saved or loaded `.ctx` files, newest first.
    pub recent_configurations: Vec<PathBuf>,
    pub default_export_format: ExportFormat,
    pub last_export_directory: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    pub fn add_recent_folder(&mut self, path: &Path) {
        push_recent(&mut self.recent_folders, path);
    }

    pub fn add_recent_configuration(&mut self, path: &Path) {
        push_recent(&mut self.recent_configurations, path);
    }

    /// Default file name for an export in the configured format.
    pub fn default_export_path(&self) -> PathBuf {
        let file_name = format!("context.{}", self.default_export_format.extension());
        match &self.last_export_directory {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recent_folders: Vec::new(),
            recent_configurations: Vec::new(),
            default_export_format: ExportFormat::Markdown,
            last_export_directory: dirs::desktop_dir(),
        }
    }
}

fn push_recent(list: &mut Vec<PathBuf>, path: &Path) {
    list.retain(|existing| existing != path);
    list.insert(0, path.to_path_buf());
    list.truncate(MAX_RECENT_ITEMS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_folders_are_capped_and_deduplicated() {
        let mut config = AppConfig::default();
        for i in 0..12 {
            config.add_recent_folder(Path::new(&format!("/work/{i}")));
        }
        assert_eq!(config.recent_folders.len(), MAX_RECENT_ITEMS);
        assert_eq!(config.recent_folders[0], PathBuf::from("/work/11"));
        assert_eq!(config.recent_folders[9], PathBuf::from("/work/2"));

        config.add_recent_folder(Path::new("/work/5"));
        assert_eq!(config.recent_folders.len(), MAX_RECENT_ITEMS);
        assert_eq!(config.recent_folders[0], PathBuf::from("/work/5"));
        assert_eq!(
            config
                .recent_folders
                .iter()
                .filter(|p| **p == PathBuf::from("/work/5"))
                .count(),
            1
        );
    }

    #[test]
    fn test_default_export_path_uses_format_extension() {
        let config = AppConfig {
            last_export_directory: Some(PathBuf::from("/exports")),
            default_export_format: ExportFormat::Json,
            ..Default::default()
        };
        assert_eq!(
            config.default_export_path(),
            PathBuf::from("/exports/context.json")
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"recent_folders": ["/a"], "default_export_format": "plain"}"#)
                .unwrap();
        assert_eq!(config.recent_folders, vec![PathBuf::from("/a")]);
        assert_eq!(config.default_export_format, ExportFormat::Plain);
        assert!(config.recent_configurations.is_empty());
    }
}
