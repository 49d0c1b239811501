//! Renders selected files into a single context document and estimates its token cost.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::CoreError;
use crate::utils::file_detection::is_binary_file;

const RULE_WIDTH: usize = 50;

/// Output layout of an exported context document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Plain,
    Markdown,
    Json,
}

impl ExportFormat {
    /// Picks the format from an output path: `.md` is Markdown, `.json` is JSON,
    /// anything else is plain text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("md") => ExportFormat::Markdown,
            Some("json") => ExportFormat::Json,
            _ => ExportFormat::Plain,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Plain => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }
}

/// What an export run wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExportReport {
    pub files_written: usize,
    pub files_skipped: usize,
    pub bytes: u64,
}

/// Renders and writes context documents.
///
/// This struct is stateless and provides methods as associated functions.
pub struct ContextExporter;

impl ContextExporter {
    /// Concatenates `files` in the given format.
    ///
    /// Binary-denylist files are skipped without being opened. Files that cannot be read
    /// are logged and skipped. `cancel` is checked before each file.
    pub async fn render(
        files: &[PathBuf],
        format: ExportFormat,
        cancel: &AtomicBool,
    ) -> Result<(String, ExportReport), CoreError> {
        let mut out = String::new();
        let mut report = ExportReport::default();

        match format {
            ExportFormat::Plain => {
                out.push_str("LLM Context\n");
                push_rule(&mut out);
            }
            ExportFormat::Markdown => out.push_str("# LLM Context\n\n"),
            ExportFormat::Json => out.push_str("{\n  \"files\": [\n"),
        }

        for (i, path) in files.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return Err(CoreError::Cancelled);
            }
            if is_binary_file(path) {
                report.files_skipped += 1;
                continue;
            }
            let content = match tokio::fs::read(path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::warn!("Error exporting {}: {}", path.display(), e);
                    report.files_skipped += 1;
                    continue;
                }
            };
            let name = file_name(path);

            match format {
                ExportFormat::Plain => {
                    out.push_str(&format!("File: {}\n", name));
                    push_rule(&mut out);
                    out.push_str(&content);
                    out.push('\n');
                    push_rule(&mut out);
                    out.push('\n');
                }
                ExportFormat::Markdown => {
                    out.push_str(&format!("## {}\n\n```\n", name));
                    out.push_str(&content);
                    out.push_str("\n```\n\n");
                }
                ExportFormat::Json => {
                    if report.files_written > 0 {
                        // Close the previous entry only once another one follows it.
                        out.truncate(out.len() - 1);
                        out.push_str(",\n");
                    }
                    out.push_str("    {\n");
                    out.push_str(&format!("      \"name\": \"{}\",\n", escape_json(&name)));
                    out.push_str(&format!(
                        "      \"content\": \"{}\"\n",
                        escape_json(&content)
                    ));
                    out.push_str("    }\n");
                }
            }
            report.files_written += 1;

            if i % 10 == 0 {
                tokio::task::yield_now().await;
            }
        }

        if format == ExportFormat::Json {
            out.push_str("  ]\n}\n");
        }

        report.bytes = out.len() as u64;
        Ok((out, report))
    }

    /// Renders `files` and writes the document to `output`.
    pub async fn export_to_file(
        files: &[PathBuf],
        output: &Path,
        format: ExportFormat,
        cancel: &AtomicBool,
    ) -> Result<ExportReport, CoreError> {
        let (content, report) = Self::render(files, format, cancel).await?;
        tokio::fs::write(output, content)
            .await
            .map_err(|e| CoreError::Io(e, output.to_path_buf()))?;
        tracing::info!(
            "Exported {} files ({} skipped) to {}",
            report.files_written,
            report.files_skipped,
            output.display()
        );
        Ok(report)
    }

    /// Rough token count: a quarter of the character count of every readable,
    /// non-binary file.
    pub fn estimate_tokens(files: &[PathBuf]) -> usize {
        files
            .par_iter()
            .filter(|path| !is_binary_file(path))
            .filter_map(|path| match fs::read(path) {
                Ok(bytes) => Some(String::from_utf8_lossy(&bytes).chars().count() / 4),
                Err(e) => {
                    tracing::warn!("Error estimating tokens for {}: {}", path.display(), e);
                    None
                }
            })
            .sum()
    }

    /// Total on-disk size of `files`; files whose metadata cannot be read count as zero.
    pub fn total_size(files: &[PathBuf]) -> u64 {
        files
            .par_iter()
            .filter_map(|path| fs::metadata(path).ok())
            .map(|m| m.len())
            .sum()
    }
}

fn push_rule(out: &mut String) {
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn escape_json(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}
