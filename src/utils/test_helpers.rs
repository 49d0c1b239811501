use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
///
/// This function is wrapped in a `Once` block to ensure that the global
/// subscriber is set exactly one time, even when tests are run in parallel.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok(); // Ignore the error if another subscriber is already installed.
    });
}

/// Writes `content` to `root/relative_path`, creating parent directories.
pub fn create_file(root: &Path, relative_path: &str, content: &str) -> PathBuf {
    let file_path = root.join(relative_path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(&file_path, content).expect("Failed to write file");
    file_path
}

/// Creates the directory `root/relative_path` (and its parents).
pub fn create_dir(root: &Path, relative_path: &str) -> PathBuf {
    let dir_path = root.join(relative_path);
    fs::create_dir_all(&dir_path).expect("Failed to create dir");
    dir_path
}

/// Builds the small fixture used across the test suites:
///
/// ```text
/// project/
/// ├── a.txt    "hello world"
/// ├── b.log    "goodbye"
/// └── sub/
///     └── c.txt  "hello again"
/// ```
///
/// Returns the path of `project/`. The fixed folder name keeps name filters
/// independent of the random temp-dir name.
pub fn create_hello_project(temp_root: &Path) -> PathBuf {
    let root = create_dir(temp_root, "project");
    create_file(&root, "a.txt", "hello world");
    create_file(&root, "b.log", "goodbye");
    create_file(&root, "sub/c.txt", "hello again");
    root
}

/// Returns true when the current process runs as root (UID 0).
/// We use this to skip permission-sensitive tests in Docker/act.
#[cfg(test)]
#[inline]
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
