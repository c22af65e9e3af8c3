#![allow(dead_code)]

use mpl_lsp::Backend;
use std::fs;
use std::path::{Path, PathBuf};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

/// A temporary directory tree with an `mpl.json` at its root.
pub struct TestProject {
    pub dir: tempfile::TempDir,
}

impl TestProject {
    /// Create a project whose `mpl.json` holds `config_json`.
    pub fn new(config_json: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        fs::write(dir.path().join("mpl.json"), config_json).expect("failed to write mpl.json");
        TestProject { dir }
    }

    /// Create a directory tree with no `mpl.json` at all.
    pub fn without_config() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        TestProject { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a file at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let full = self.path(relative);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write file");
        full
    }

    pub fn uri(&self, relative: &str) -> Url {
        Url::from_file_path(self.path(relative)).expect("absolute path")
    }
}

/// Open `uri` with `text` in `backend`.
pub async fn open(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "mpl".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

/// Send a goto-definition request and return the locations, if any.
pub async fn definition_at(
    backend: &Backend,
    uri: &Url,
    line: u32,
    character: u32,
) -> Option<Vec<Location>> {
    let params = GotoDefinitionParams {
        text_document_position_params: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position: Position { line, character },
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    };

    match backend.goto_definition(params).await.unwrap() {
        Some(GotoDefinitionResponse::Array(locations)) => Some(locations),
        Some(GotoDefinitionResponse::Scalar(location)) => Some(vec![location]),
        Some(GotoDefinitionResponse::Link(_)) => panic!("unexpected location links"),
        None => None,
    }
}
