use std::path::Path;

/// Extensions that are never read for content filtering, export or token estimation.
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "pdb", "zip", "rar", "7z", "png", "jpg", "jpeg", "gif", "pdf",
];

/// Files above this size are skipped by content filters.
pub const MAX_CONTENT_FILTER_BYTES: u64 = 10 * 1024 * 1024; // 10 MiB

/// Returns `true` if the path carries an extension from the binary denylist.
///
/// The comparison is case-insensitive, so `LOGO.PNG` is treated like `logo.png`.
pub fn is_binary_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            BINARY_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Returns `true` if a file of this path and size may be read for a content filter.
pub fn is_content_searchable(path: &Path, size: u64) -> bool {
    !is_binary_file(path) && size <= MAX_CONTENT_FILTER_BYTES
}
