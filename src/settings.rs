/// Layered editor settings consulted when `mpl.json` leaves a field unset.
///
/// The settings scope is a read-only key-value lookup over the `compiler`
/// section.  A [`SettingsScope`] stacks several JSON objects and answers a key
/// from the first layer that defines it:
///
///   1. Client settings scoped to the project directory
///      (`workspace/configuration` with a `scopeUri`).
///   2. Client-wide settings (`initializationOptions` or the latest
///      `workspace/didChangeConfiguration` payload).
///   3. The user settings file `<config dir>/mpl/settings.toml`, table
///      `[compiler]`.
///
/// Keys nobody defines fall back to the documented defaults in
/// [`compiler_path`] and [`include_paths`].
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use serde_json::Value;

/// Settings section holding every key below.
pub const SECTION: &str = "compiler";

/// Compiler executable used when `mpl.json` has no `compilerPath`.
pub const KEY_COMPILER_PATH: &str = "compilerPath";

/// Include directories used when `mpl.json` has no `includePaths`.
pub const KEY_INCLUDE_PATH: &str = "includePath";

/// Default for [`KEY_COMPILER_PATH`].
pub const DEFAULT_COMPILER_PATH: &str = "mplc";

/// Read-only key-value view of the settings applicable to one directory.
pub trait Settings: Send + Sync + std::fmt::Debug {
    /// Look up a raw value.  `None` means "unset" at every layer.
    fn get(&self, key: &str) -> Option<&Value>;
}

/// An immutable stack of settings layers, highest priority first.
#[derive(Debug, Clone, Default)]
pub struct SettingsScope {
    layers: Vec<Value>,
}

impl SettingsScope {
    /// A scope with no layers: every key resolves to its default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a scope from layers ordered highest priority first.  Layers
    /// that are not JSON objects are dropped.
    pub fn from_layers(layers: impl IntoIterator<Item = Value>) -> Self {
        Self {
            layers: layers.into_iter().filter(Value::is_object).collect(),
        }
    }
}

impl Settings for SettingsScope {
    fn get(&self, key: &str) -> Option<&Value> {
        self.layers
            .iter()
            .filter_map(|layer| layer.get(key))
            .find(|v| !v.is_null())
    }
}

/// Resolve the default compiler path from `settings`.
pub fn compiler_path(settings: &dyn Settings) -> String {
    match settings.get(KEY_COMPILER_PATH) {
        Some(Value::String(path)) => path.clone(),
        Some(other) => {
            tracing::warn!(value = %other, "ignoring non-string `{}` setting", KEY_COMPILER_PATH);
            DEFAULT_COMPILER_PATH.to_string()
        }
        None => DEFAULT_COMPILER_PATH.to_string(),
    }
}

/// Resolve the default include paths from `settings`.
///
/// A single string is accepted as a one-element list.
pub fn include_paths(settings: &dyn Settings) -> Vec<String> {
    match settings.get(KEY_INCLUDE_PATH) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        Some(other) => {
            tracing::warn!(value = %other, "ignoring malformed `{}` setting", KEY_INCLUDE_PATH);
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Extract the `compiler` section from a client settings payload.
///
/// Clients send either the section itself or an object wrapping it
/// (`{ "compiler": { ... } }`); both are accepted.
pub fn client_section(payload: &Value) -> Value {
    match payload.get(SECTION) {
        Some(section) if section.is_object() => section.clone(),
        _ if payload.get(KEY_COMPILER_PATH).is_some() || payload.get(KEY_INCLUDE_PATH).is_some() => {
            payload.clone()
        }
        _ => Value::Null,
    }
}

/// Location of the per-user settings file, if a config directory exists.
pub fn user_settings_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("mpl").join("settings.toml"))
}

/// Load the `[compiler]` table of a TOML settings file as a JSON layer.
///
/// A missing file yields `Value::Null` (an empty layer); an unreadable or
/// malformed one is logged and also yields `Value::Null`.
pub fn load_user_settings(path: &Path) -> Value {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Value::Null,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read user settings");
            return Value::Null;
        }
    };

    let table: toml::Table = match toml::from_str(&content) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse user settings");
            return Value::Null;
        }
    };

    table
        .get(SECTION)
        .and_then(|section| serde_json::to_value(section).ok())
        .unwrap_or(Value::Null)
}
