//! MPL language server.
//!
//! Locates the `mpl.json` governing a source file, turns it into a compiler
//! command line, runs the compiler on request, and answers "go to definition"
//! from the metadata file the compiler emits with `-meta-info`.
//!
//! - [`project`]: nearest-enclosing `mpl.json` discovery
//! - [`config`]: parsing and loading `mpl.json`
//! - [`settings`]: layered editor settings supplying defaults
//! - [`args`]: compiler argument construction
//! - [`meta`]: metadata artifact path and document model
//! - [`occurrence`]: mapping recorded occurrence paths to real files
//! - [`definition`]: the symbol lookup pipeline
//! - [`runner`]: compiler process execution and the build command
//! - `server`: the `LanguageServer` implementation
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use parking_lot::Mutex;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;

pub mod args;
pub mod config;
pub mod definition;
pub mod error;
pub mod meta;
pub mod occurrence;
pub mod project;
pub mod runner;
mod server;
pub mod settings;
pub mod util;

/// Command identifier for building the project owning a document.
pub const BUILD_COMMAND: &str = "mpl.buildProject";

pub struct Backend {
    pub(crate) name: String,
    pub(crate) version: String,
    /// Text of documents currently open in the client, keyed by URI.
    pub(crate) open_files: Arc<Mutex<HashMap<String, String>>>,
    /// Folders the client has open, in the order it reported them.
    pub(crate) workspace_folders: Arc<Mutex<Vec<PathBuf>>>,
    /// Client-wide `compiler` settings section.
    pub(crate) client_settings: Arc<Mutex<serde_json::Value>>,
    /// `[compiler]` table of the user settings file, read once at startup.
    pub(crate) user_settings: serde_json::Value,
    /// Most recently opened or edited document; the build command's target
    /// when none is given.
    pub(crate) last_active: Arc<Mutex<Option<Url>>>,
    /// Whether the client answers `workspace/configuration`.
    pub(crate) supports_configuration: AtomicBool,
    pub(crate) client: Option<Client>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let user_settings = settings::user_settings_path()
            .map(|path| settings::load_user_settings(&path))
            .unwrap_or(serde_json::Value::Null);
        Self::with_parts(Some(client), Vec::new(), user_settings)
    }

    pub fn new_test() -> Self {
        Self::with_parts(None, Vec::new(), serde_json::Value::Null)
    }

    /// Test backend with the given workspace folders already open.
    pub fn new_test_with_workspace(folders: Vec<PathBuf>) -> Self {
        Self::with_parts(None, folders, serde_json::Value::Null)
    }

    fn with_parts(
        client: Option<Client>,
        folders: Vec<PathBuf>,
        user_settings: serde_json::Value,
    ) -> Self {
        Self {
            name: "MPL Language Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_files: Arc::new(Mutex::new(HashMap::new())),
            workspace_folders: Arc::new(Mutex::new(folders)),
            client_settings: Arc::new(Mutex::new(serde_json::Value::Null)),
            user_settings,
            last_active: Arc::new(Mutex::new(None)),
            supports_configuration: AtomicBool::new(false),
            client,
        }
    }

    /// Replace the client-wide settings section (used by tests and by
    /// `workspace/didChangeConfiguration`).
    pub fn set_client_settings(&self, section: serde_json::Value) {
        *self.client_settings.lock() = section;
    }

    /// Snapshot of the open workspace folders.
    pub fn workspace_folders(&self) -> Vec<PathBuf> {
        self.workspace_folders.lock().clone()
    }

    /// Text of an open document, if the client has it open.
    pub fn open_document(&self, uri: &str) -> Option<String> {
        self.open_files.lock().get(uri).cloned()
    }
}
