/// Project discovery.
///
/// Every source file is governed by the nearest enclosing directory that
/// contains an `mpl.json`.  The search starts at the file's own directory and
/// walks up a bounded number of ancestors, so the innermost project wins.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CONFIG_FILE_NAME;
use crate::error::ProjectError;
use crate::settings::Settings;

/// How many directories (the file's own included) are checked for an
/// `mpl.json` before giving up.
pub const MAX_ANCESTOR_DEPTH: usize = 10;

/// The directory that owns a file's build plus the settings applicable there.
///
/// Created fresh for every request and never mutated.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub workspace_root: PathBuf,
    pub settings: Arc<dyn Settings>,
}

impl ProjectContext {
    pub fn new(workspace_root: PathBuf, settings: Arc<dyn Settings>) -> Self {
        Self {
            workspace_root,
            settings,
        }
    }

    /// Path of this project's `mpl.json`.
    pub fn config_path(&self) -> PathBuf {
        self.workspace_root.join(CONFIG_FILE_NAME)
    }
}

/// Find the directory owning `file_path`'s build.
///
/// Checks the containing directory and up to `MAX_ANCESTOR_DEPTH - 1` of its
/// ancestors.  Fails with `NoProjectFound` when the bound is exhausted or the
/// filesystem root is passed without finding a configuration file.
pub async fn find_project_root(file_path: &Path) -> Result<PathBuf, ProjectError> {
    let mut dir = match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    for _ in 0..MAX_ANCESTOR_DEPTH {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            tracing::debug!(
                file = %file_path.display(),
                root = %dir.display(),
                "located project"
            );
            return Ok(dir);
        }
        match dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => dir = parent.to_path_buf(),
            _ => break,
        }
    }

    Err(ProjectError::NoProjectFound {
        file: file_path.to_path_buf(),
    })
}

/// Locate the project owning `file_path` and bind `settings` to it.
pub async fn locate(
    file_path: &Path,
    settings: Arc<dyn Settings>,
) -> Result<ProjectContext, ProjectError> {
    let root = find_project_root(file_path).await?;
    Ok(ProjectContext::new(root, settings))
}
