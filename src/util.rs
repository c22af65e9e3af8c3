/// Text and path helpers shared by the lookup and build pipelines.
use std::path::{Component, Path, PathBuf};

use tower_lsp::lsp_types::{MessageType, Position};

use crate::Backend;

impl Backend {
    /// Append a line to the client's log, mirrored to the tracing output.
    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        tracing::debug!(target: "mpl_lsp::client", "{message}");
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }

    /// Show a message to the user.
    pub(crate) async fn show_message(&self, typ: MessageType, message: String) {
        tracing::info!("{message}");
        if let Some(client) = &self.client {
            client.show_message(typ, message).await;
        }
    }
}

/// Characters that make up an MPL identifier for lookup purposes.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Extract the identifier touching `position`, if any.
///
/// The cursor may sit anywhere inside the word or directly after its last
/// character.  The LSP character offset is treated as a char index.
pub fn extract_word_at_position(content: &str, position: Position) -> Option<String> {
    let line = content.lines().nth(position.line as usize)?;
    let chars: Vec<char> = line.chars().collect();

    let pos = position.character as usize;
    if pos > chars.len() {
        return None;
    }

    let mut start = pos;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }

    let mut end = pos;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }

    if start < end {
        Some(chars[start..end].iter().collect())
    } else {
        None
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` never climbs above a root or prefix component.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Express `target` relative to `base`.
///
/// Relative targets are first resolved against `base`.  A target equal to
/// `base` becomes `"."`.  When no relative form exists (different drive
/// prefixes on Windows) the normalized absolute target is returned.
pub fn make_relative_to(base: &Path, target: &str) -> String {
    let target = Path::new(target);
    let absolute = if target.is_absolute() {
        normalize_lexically(target)
    } else {
        normalize_lexically(&base.join(target))
    };
    let base = normalize_lexically(base);

    match pathdiff::diff_paths(&absolute, &base) {
        Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Some(rel) => rel.to_string_lossy().into_owned(),
        None => absolute.to_string_lossy().into_owned(),
    }
}

/// Render a path with `/` separators regardless of platform.
pub fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::RootDir => None,
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect::<Vec<_>>()
        .join("/")
}
