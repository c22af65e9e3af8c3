/// Project configuration (`mpl.json`) support.
///
/// A project configuration declares how to build one entry point:
///
/// ```json
/// {
///     "compilerPath": "/opt/mpl/bin/mplc",
///     "includePaths": ["lib", "/usr/share/mpl"],
///     "triple": "x86_64-linux-gnu",
///     "entryPoint": "src/main.mpl",
///     "output": "build/main",
///     "debug": false,
///     "metaInfo": true
/// }
/// ```
///
/// Only `entryPoint` and `output` are required.  Absent optional fields stay
/// `None` here; defaults from the settings scope are applied when compiler
/// arguments are built, never written back into the parsed value.
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, ProjectError};
use crate::project::ProjectContext;

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "mpl.json";

/// A parsed, validated project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub compiler_path: Option<String>,
    pub include_paths: Option<Vec<String>>,
    pub triple: Option<String>,
    pub entry_point: String,
    pub output: String,
    pub debug: Option<bool>,
    pub meta_info: Option<bool>,
}

/// Wire shape of `mpl.json`; every field optional so that missing required
/// fields surface as `ConfigError::Invalid` instead of a serde message about
/// the whole document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    compiler_path: Option<String>,
    include_paths: Option<Vec<String>>,
    triple: Option<String>,
    entry_point: Option<String>,
    output: Option<String>,
    debug: Option<bool>,
    meta_info: Option<bool>,
}

impl ProjectConfig {
    /// File stem of the entry point (`src/main.mpl` -> `main`), used to name
    /// the metadata artifact when no output is configured.
    pub fn entry_base_name(&self) -> String {
        Path::new(&self.entry_point)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Parse the text of an `mpl.json` document.
///
/// Returns `ConfigError::Malformed` when the text is not JSON at all and
/// `ConfigError::Invalid` when it is JSON but lacks `entryPoint` / `output`
/// or has a field of the wrong type.
pub fn parse(raw: &str) -> Result<ProjectConfig, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(ConfigError::Malformed)?;
    let raw = RawConfig::deserialize(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;

    let entry_point = match raw.entry_point {
        Some(entry) if !entry.trim().is_empty() => entry,
        Some(_) => {
            return Err(ConfigError::Invalid(
                "field `entryPoint` must not be empty".to_string(),
            ));
        }
        None => {
            return Err(ConfigError::Invalid(
                "missing required field `entryPoint`".to_string(),
            ));
        }
    };
    let output = raw
        .output
        .ok_or_else(|| ConfigError::Invalid("missing required field `output`".to_string()))?;

    Ok(ProjectConfig {
        compiler_path: raw.compiler_path,
        include_paths: raw.include_paths,
        triple: raw.triple,
        entry_point,
        output,
        debug: raw.debug,
        meta_info: raw.meta_info,
    })
}

/// Read and parse `<root>/mpl.json`.
pub async fn load_from_dir(root: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = tokio::fs::read_to_string(root.join(CONFIG_FILE_NAME)).await?;
    parse(&content)
}

/// Load the configuration governing `context`.
///
/// Read and parse failures are folded into one `ProjectError::ConfigLoad`;
/// callers only learn that the project at that root could not be loaded.
pub async fn load(context: &ProjectContext) -> Result<ProjectConfig, ProjectError> {
    load_from_dir(&context.workspace_root)
        .await
        .map_err(|source| {
            tracing::debug!(
                root = %context.workspace_root.display(),
                error = %source,
                "project config unavailable"
            );
            ProjectError::ConfigLoad {
                root: context.workspace_root.clone(),
                source,
            }
        })
}
