/// Compiler metadata artifact support.
///
/// When invoked with `-meta-info` the compiler writes `<output>.meta.json`
/// next to its output.  Only the `globals` table is consumed here: it maps a
/// symbol name to the places the symbol is defined.
///
/// ```json
/// { "globals": { "main": [{ "file": "src/main.mpl", "line": 3, "column": 5 }] } }
/// ```
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::config;
use crate::error::MetaError;
use crate::project::ProjectContext;

/// Suffix appended to the output path to name the metadata artifact.
pub const META_SUFFIX: &str = ".meta.json";

/// One recorded definition site.  Line and column are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Occurrence {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<i64>,
    #[serde(default)]
    pub column: Option<i64>,
}

impl Occurrence {
    /// Recorded file path; an absent or null `file` reads as empty.
    pub fn file(&self) -> &str {
        self.file.as_deref().unwrap_or_default()
    }

    /// Zero-based `(line, column)`.  Missing or zero values count as 1,
    /// anything below 1 clamps to 0.
    pub fn zero_based_position(&self) -> (u32, u32) {
        fn convert(value: Option<i64>) -> u32 {
            let one_based = value.filter(|v| *v != 0).unwrap_or(1);
            u32::try_from((one_based - 1).max(0)).unwrap_or(u32::MAX)
        }
        (convert(self.line), convert(self.column))
    }
}

/// The parts of the metadata document the server understands.
///
/// Symbol entries stay raw until looked up, so a broken entry only hides
/// the symbol it belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaInfo {
    #[serde(default)]
    pub globals: HashMap<String, Value>,
}

impl MetaInfo {
    /// Recorded occurrences of `name`, in document order.
    ///
    /// A non-array entry yields nothing; entries that are not occurrence
    /// objects are skipped.
    pub fn occurrences(&self, name: &str) -> Vec<Occurrence> {
        let Some(Value::Array(items)) = self.globals.get(name) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match Occurrence::deserialize(item) {
                Ok(occurrence) => Some(occurrence),
                Err(e) => {
                    tracing::debug!(name, error = %e, "skipping malformed occurrence");
                    None
                }
            })
            .collect()
    }
}

/// Compute where the metadata artifact for a build should be.
///
/// - blank `output`: `<root>/<entry_base>.meta.json`
/// - absolute `output`: `<output>.meta.json` (suffix appended, extension kept)
/// - relative `output`: `<root>/<output>.meta.json`
///
/// No existence check is made.
pub fn meta_path(workspace_root: &Path, output: &str, entry_base: &str) -> PathBuf {
    let out = output.trim();
    if out.is_empty() {
        return workspace_root.join(format!("{entry_base}{META_SUFFIX}"));
    }
    if Path::new(out).is_absolute() {
        return PathBuf::from(format!("{out}{META_SUFFIX}"));
    }
    workspace_root.join(format!("{out}{META_SUFFIX}"))
}

/// Parse the text of a metadata artifact.
pub fn parse(raw: &str) -> Result<MetaInfo, MetaError> {
    Ok(serde_json::from_str(raw)?)
}

/// Read and parse the metadata artifact at `path`.
pub async fn read(path: &Path) -> Result<MetaInfo, MetaError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(MetaError::Missing(path.to_path_buf()));
    }
    let raw = tokio::fs::read_to_string(path).await?;
    parse(&raw)
}

/// Load the metadata for the project in `context`.
///
/// Every failure (config unreadable, artifact missing, artifact malformed)
/// means "no metadata available" and yields `None`.
pub async fn load_for_project(context: &ProjectContext) -> Option<MetaInfo> {
    let cfg = config::load(context).await.ok()?;
    let path = meta_path(&context.workspace_root, &cfg.output, &cfg.entry_base_name());

    match read(&path).await {
        Ok(meta) => {
            tracing::debug!(path = %path.display(), symbols = meta.globals.len(), "loaded metadata");
            Some(meta)
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "metadata unavailable");
            None
        }
    }
}
