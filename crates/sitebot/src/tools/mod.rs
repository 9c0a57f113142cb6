//! The file and git tools the website agent works with.
//!
//! Every tool is bound to a base directory. Path arguments are resolved
//! against it and may not leave it.

mod files;
mod git;
mod list_files;

use std::path::{Path, PathBuf};

use sitebot_core::tool::sandbox;

pub use files::{ReadFileTool, WriteFileTool};
pub use git::{GitAddTool, GitCommitTool, GitPushTool};
pub use list_files::ListFilesTool;

fn absolute_base(base_dir: &Path) -> PathBuf {
    match std::path::absolute(base_dir) {
        Ok(absolute) => sandbox::normalize(&absolute),
        Err(_) => base_dir.to_owned(),
    }
}

/// Returns `path` relative to `base_dir` for display, or the path itself
/// when it is not below it.
fn relative_display(base_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    if relative.as_os_str().is_empty() {
        ".".to_owned()
    } else {
        relative.to_string_lossy().into_owned()
    }
}
