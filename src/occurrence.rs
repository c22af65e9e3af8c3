/// Mapping metadata occurrences back to files on disk.
///
/// The compiler records occurrence paths relative to whatever directory it
/// happened to run in, so a recorded `src/util.mpl` may live under the
/// project root, under the build output directory, or under a different
/// workspace folder altogether.  Resolution tries a fixed sequence of
/// strategies and stops at the first candidate that is an existing file:
///
///   1. [`Strategy::ProjectRoot`]: `<root>/<path>`
///   2. [`Strategy::OutputDir`]: `<root>/<output dir>/<path>`
///   3. [`Strategy::WorkspaceFolder`]: `<folder>/<path>` then
///      `<folder>/<output dir>/<path>` for every other workspace folder
///   4. [`Strategy::FileName`]: any file in the searched trees with the same
///      file name
///   5. [`Strategy::PathSuffix`]: any file whose forward-slash path ends with
///      `<path>` on a component boundary (`pkg/src/foo.mpl` matches
///      `src/foo.mpl`, `lib/my_util.mpl` never matches `util.mpl`)
///
/// The tree searches walk the workspace folders (plus the project root when it
/// lies outside all of them) in file-name order and return the first hit.
/// With several same-named files the pick is stable but may be the wrong one.
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::config;
use crate::meta::Occurrence;
use crate::project::ProjectContext;
use crate::util::{normalize_lexically, to_forward_slashes};

/// One way of turning a recorded path into candidate files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ProjectRoot,
    OutputDir,
    WorkspaceFolder,
    FileName,
    PathSuffix,
}

impl Strategy {
    /// Strategies in the order they are tried.
    pub const ORDER: [Strategy; 5] = [
        Strategy::ProjectRoot,
        Strategy::OutputDir,
        Strategy::WorkspaceFolder,
        Strategy::FileName,
        Strategy::PathSuffix,
    ];
}

/// An occurrence mapped to a real file, with a zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub strategy: Strategy,
}

/// Normalize a recorded path: unify separators and strip any leading `./`,
/// `/` or `\` runs.  Returns `None` when nothing is left.
pub fn normalize_recorded(recorded: &str) -> Option<PathBuf> {
    let unified = recorded.replace('\\', "/");
    let mut rest = unified.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }

    let path: PathBuf = rest.split('/').filter(|s| !s.is_empty()).collect();
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Directory the compiler writes into: the parent of `output` when it names
/// a file (has an extension), otherwise `output` itself.
pub fn output_dir(output: &str) -> Option<PathBuf> {
    let out = Path::new(output.trim());
    let dir = if out.extension().is_some() {
        out.parent()?
    } else {
        out
    };
    if dir.as_os_str().is_empty() {
        None
    } else {
        Some(dir.to_path_buf())
    }
}

/// Resolves recorded occurrence paths for one project.
#[derive(Debug, Clone)]
pub struct OccurrenceResolver {
    root: PathBuf,
    output_dir: Option<PathBuf>,
    other_folders: Vec<PathBuf>,
    search_roots: Vec<PathBuf>,
}

impl OccurrenceResolver {
    /// Build a resolver from already-known inputs.
    ///
    /// `workspace_folders` are all folders the client has open; the project
    /// root itself is skipped when it appears among them.
    pub fn new(root: PathBuf, output: &str, workspace_folders: &[PathBuf]) -> Self {
        let other_folders: Vec<PathBuf> = workspace_folders
            .iter()
            .filter(|f| **f != root)
            .cloned()
            .collect();

        let mut search_roots: Vec<PathBuf> = workspace_folders.to_vec();
        if !search_roots.iter().any(|f| root.starts_with(f)) {
            search_roots.push(root.clone());
        }

        Self {
            output_dir: output_dir(output),
            root,
            other_folders,
            search_roots,
        }
    }

    /// Build a resolver for `context`, reading the output path from its
    /// `mpl.json`.  An unreadable configuration counts as "no output".
    pub async fn for_project(context: &ProjectContext, workspace_folders: &[PathBuf]) -> Self {
        let output = config::load(context)
            .await
            .map(|cfg| cfg.output)
            .unwrap_or_default();
        Self::new(context.workspace_root.clone(), &output, workspace_folders)
    }

    /// Find the file a recorded path refers to.
    pub async fn resolve_path(&self, recorded: &str) -> Option<(PathBuf, Strategy)> {
        let normalized = normalize_recorded(recorded)?;

        for strategy in Strategy::ORDER {
            if let Some(path) = self.try_strategy(strategy, &normalized).await {
                tracing::debug!(recorded, path = %path.display(), ?strategy, "resolved occurrence");
                return Some((path, strategy));
            }
        }

        tracing::debug!(recorded, "occurrence unresolved");
        None
    }

    /// Resolve a full occurrence, converting its position to zero-based.
    pub async fn resolve(&self, occurrence: &Occurrence) -> Option<ResolvedLocation> {
        let (path, strategy) = self.resolve_path(occurrence.file()).await?;
        let (line, column) = occurrence.zero_based_position();
        Some(ResolvedLocation {
            path,
            line,
            column,
            strategy,
        })
    }

    /// Run a single strategy against an already-normalized path.
    pub async fn try_strategy(&self, strategy: Strategy, normalized: &Path) -> Option<PathBuf> {
        match strategy {
            Strategy::FileName => {
                let name = normalized.file_name()?.to_os_string();
                self.search_tree(move |path| path.file_name() == Some(name.as_os_str()))
                    .await
            }
            Strategy::PathSuffix => {
                let suffix = to_forward_slashes(normalized);
                self.search_tree(move |path| {
                    ends_with_components(&to_forward_slashes(path), &suffix)
                })
                .await
            }
            _ => first_file(self.candidates(strategy, normalized)).await,
        }
    }

    /// Direct candidate paths for the non-searching strategies, in order.
    pub fn candidates(&self, strategy: Strategy, normalized: &Path) -> Vec<PathBuf> {
        let out_dir = self.output_dir.as_deref();
        let mut candidates = Vec::new();
        match strategy {
            Strategy::ProjectRoot => candidates.push(self.root.join(normalized)),
            Strategy::OutputDir => {
                if let Some(dir) = out_dir {
                    candidates.push(self.root.join(dir).join(normalized));
                }
            }
            Strategy::WorkspaceFolder => {
                for folder in &self.other_folders {
                    candidates.push(folder.join(normalized));
                    if let Some(dir) = out_dir {
                        candidates.push(folder.join(dir).join(normalized));
                    }
                }
            }
            Strategy::FileName | Strategy::PathSuffix => {}
        }
        candidates
            .into_iter()
            .map(|p| normalize_lexically(&p))
            .collect()
    }

    async fn search_tree<F>(&self, matches: F) -> Option<PathBuf>
    where
        F: Fn(&Path) -> bool + Send + 'static,
    {
        let roots = self.search_roots.clone();
        tokio::task::spawn_blocking(move || find_in_trees(&roots, matches))
            .await
            .ok()
            .flatten()
    }
}

/// `text` ends with `suffix` starting at a `/` boundary (or is equal to it).
fn ends_with_components(text: &str, suffix: &str) -> bool {
    text.strip_suffix(suffix)
        .is_some_and(|head| head.is_empty() || head.ends_with('/'))
}

async fn first_file(candidates: Vec<PathBuf>) -> Option<PathBuf> {
    for candidate in candidates {
        if is_file(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Walk `roots` in order and return the first file accepted by `matches`.
/// Hidden entries are skipped; ignore files are not honoured, since build
/// output directories are usually git-ignored.
fn find_in_trees(roots: &[PathBuf], matches: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    roots.iter().find_map(|root| {
        WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
            .flatten()
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .find(|entry| matches(entry.path()))
            .map(|entry| entry.into_path())
    })
}
