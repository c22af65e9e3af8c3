/// Goto-definition from compiler metadata.
///
/// Given a cursor position in an MPL file this module:
///   1. Extracts the identifier under the cursor.
///   2. Locates the project owning the file.
///   3. Loads the project's metadata artifact (missing or unparsable means
///      no result).
///   4. Looks the identifier up in `globals`.
///   5. Resolves every recorded occurrence to a file, dropping the ones that
///      cannot be found.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::error::ProjectError;
use crate::meta;
use crate::occurrence::{OccurrenceResolver, ResolvedLocation};
use crate::project::{self, ProjectContext};
use crate::settings::SettingsScope;
use crate::util::extract_word_at_position;

/// File extension of MPL sources.
pub const MPL_EXTENSION: &str = "mpl";

/// Resolve every recorded definition of `name` in the project of `context`.
///
/// Returns an empty list when no metadata is available, the name is not
/// recorded, or none of its occurrences map to an existing file.
pub async fn lookup(
    context: &ProjectContext,
    workspace_folders: &[PathBuf],
    name: &str,
) -> Vec<ResolvedLocation> {
    let Some(meta) = meta::load_for_project(context).await else {
        return Vec::new();
    };

    let occurrences = meta.occurrences(name);
    if occurrences.is_empty() {
        tracing::debug!(name, "symbol not recorded in metadata");
        return Vec::new();
    }

    let resolver = OccurrenceResolver::for_project(context, workspace_folders).await;
    let mut locations = Vec::with_capacity(occurrences.len());
    for occurrence in &occurrences {
        if let Some(location) = resolver.resolve(occurrence).await {
            locations.push(location);
        }
    }
    locations
}

/// Convert a resolved location into an LSP location.
pub fn to_lsp_location(resolved: &ResolvedLocation) -> Option<Location> {
    let uri = Url::from_file_path(&resolved.path).ok()?;
    let position = Position {
        line: resolved.line,
        character: resolved.column,
    };
    Some(Location {
        uri,
        range: Range {
            start: position,
            end: position,
        },
    })
}

impl Backend {
    /// Build the project context for `file`: nearest project root plus the
    /// settings scope applicable to that directory.
    pub async fn project_context_for_file(
        &self,
        file: &Path,
    ) -> Result<ProjectContext, ProjectError> {
        let root = project::find_project_root(file).await?;
        let scope = self.settings_scope(&root).await;
        Ok(ProjectContext::new(root, Arc::new(scope)))
    }

    /// Assemble the settings layers for `dir`, highest priority first.
    pub(crate) async fn settings_scope(&self, dir: &Path) -> SettingsScope {
        let mut layers = Vec::with_capacity(3);

        if let Some(client) = &self.client
            && self
                .supports_configuration
                .load(std::sync::atomic::Ordering::Relaxed)
            && let Ok(scope_uri) = Url::from_directory_path(dir)
        {
            let item = ConfigurationItem {
                scope_uri: Some(scope_uri),
                section: Some(crate::settings::SECTION.to_string()),
            };
            match client.configuration(vec![item]).await {
                Ok(values) => layers.extend(values.into_iter().take(1)),
                Err(e) => tracing::debug!(error = %e, "workspace/configuration failed"),
            }
        }

        layers.push(self.client_settings.lock().clone());
        layers.push(self.user_settings.clone());
        SettingsScope::from_layers(layers)
    }

    /// Handle a "go to definition" request.
    ///
    /// Returns `None` when the document is not an MPL file, there is no word
    /// under the cursor, or resolution fails at any step.
    pub async fn resolve_definition(&self, uri: &Url, position: Position) -> Option<Vec<Location>> {
        let path = uri.to_file_path().ok()?;
        if path.extension().and_then(|e| e.to_str()) != Some(MPL_EXTENSION) {
            return None;
        }

        let content = match self.open_document(uri.as_str()) {
            Some(text) => text,
            None => tokio::fs::read_to_string(&path).await.ok()?,
        };
        let word = extract_word_at_position(&content, position)?;

        let context = match self.project_context_for_file(&path).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::debug!(error = %e, "no project for definition request");
                return None;
            }
        };

        let folders = self.workspace_folders();
        let locations: Vec<Location> = lookup(&context, &folders, &word)
            .await
            .iter()
            .filter_map(to_lsp_location)
            .collect();

        if locations.is_empty() {
            None
        } else {
            Some(locations)
        }
    }
}
