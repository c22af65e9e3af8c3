/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles all LSP protocol messages (initialize, didOpen, didChange,
/// didClose, definition, executeCommand, etc.).
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;

use crate::settings;
use crate::{BUILD_COMMAND, Backend};

fn folder_path(folder: &WorkspaceFolder) -> Option<PathBuf> {
    folder.uri.to_file_path().ok()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Prefer the folder list; fall back to the single root URI.
        #[allow(deprecated)]
        let folders: Vec<PathBuf> = match &params.workspace_folders {
            Some(folders) if !folders.is_empty() => folders.iter().filter_map(folder_path).collect(),
            _ => params
                .root_uri
                .as_ref()
                .and_then(|uri| uri.to_file_path().ok())
                .into_iter()
                .collect(),
        };
        *self.workspace_folders.lock() = folders;

        if let Some(options) = &params.initialization_options {
            self.set_client_settings(settings::client_section(options));
        }

        let supports_configuration = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|ws| ws.configuration)
            .unwrap_or(false);
        self.supports_configuration
            .store(supports_configuration, Ordering::Relaxed);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![BUILD_COMMAND.to_string()],
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let folder_count = self.workspace_folders.lock().len();
        self.log(
            MessageType::INFO,
            format!(
                "{} initialized! {} workspace folder(s)",
                self.name, folder_count
            ),
        )
        .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.to_string();

        self.open_files.lock().insert(uri.clone(), doc.text);
        *self.last_active.lock() = Some(doc.uri);

        self.log(MessageType::INFO, format!("Opened file: {}", uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;

        // Full sync: the last change carries the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.open_files.lock().insert(uri.to_string(), change.text);
        }
        *self.last_active.lock() = Some(uri);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();

        self.open_files.lock().remove(&uri);

        self.log(MessageType::INFO, format!("Closed file: {}", uri))
            .await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let removed: Vec<PathBuf> = params.event.removed.iter().filter_map(folder_path).collect();
        let added: Vec<PathBuf> = params.event.added.iter().filter_map(folder_path).collect();

        let mut folders = self.workspace_folders.lock();
        folders.retain(|f| !removed.contains(f));
        for folder in added {
            if !folders.contains(&folder) {
                folders.push(folder);
            }
        }
        tracing::debug!(folders = folders.len(), "workspace folders changed");
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.set_client_settings(settings::client_section(&params.settings));
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        Ok(self
            .resolve_definition(&uri, position)
            .await
            .map(GotoDefinitionResponse::Array))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        if params.command != BUILD_COMMAND {
            return Err(Error::invalid_params(format!(
                "unknown command: {}",
                params.command
            )));
        }

        let target = params
            .arguments
            .into_iter()
            .next()
            .and_then(|arg| serde_json::from_value::<Url>(arg).ok());

        let outcome = self.build_project(target).await;
        tracing::debug!(?outcome, "build command finished");
        Ok(None)
    }
}
