/// Compiler execution and the `mpl.buildProject` command.
///
/// One build trigger launches exactly one compiler process in the project
/// root and waits for it.  Its stdout and stderr are forwarded line by line
/// to an [`OutputSink`]; in the server that sink is the client's log.
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tower_lsp::lsp_types::{MessageType, Url};

use crate::Backend;
use crate::args::{self, CompilerInvocation};
use crate::config;

/// Where build output goes.
#[tower_lsp::async_trait]
pub trait OutputSink: Send + Sync {
    async fn append_line(&self, line: String);
}

/// Errors that prevent a compiler run from completing.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to start process: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),
}

/// How a build command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The compiler exited with status 0.
    Succeeded,
    /// The compiler ran and exited unsuccessfully; `None` when it was
    /// terminated without an exit code.
    Failed(Option<i32>),
    /// The build never started (no document, no project, bad config, or the
    /// process could not be launched).
    NotStarted(String),
}

/// Run `invocation` with `cwd` as working directory, streaming its output
/// into `sink`.
///
/// The environment is inherited.  A nonzero exit is not an error here; it is
/// returned in the `ExitStatus`.
pub async fn run(
    invocation: &CompilerInvocation,
    cwd: &Path,
    sink: &dyn OutputSink,
) -> Result<ExitStatus, RunError> {
    let mut command = Command::new(invocation.program());
    command
        .args(invocation.args())
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = command.spawn().map_err(RunError::Launch)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    while let Some(line) = rx.recv().await {
        sink.append_line(line).await;
    }

    child.wait().await.map_err(RunError::Wait)
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

/// Sink writing to the client's log (the "MPL Build" output).
struct ClientLog<'a>(&'a Backend);

#[tower_lsp::async_trait]
impl OutputSink for ClientLog<'_> {
    async fn append_line(&self, line: String) {
        self.0.log(MessageType::LOG, line).await;
    }
}

impl Backend {
    /// Execute the build command for `target`, or for the most recently
    /// active document when no target is given.
    pub async fn build_project(&self, target: Option<Url>) -> BuildOutcome {
        let (root, invocation) = match self.prepare_build(target).await {
            Ok(prepared) => prepared,
            Err(message) => {
                let message = format!("Failed to run command: {message}");
                self.show_message(MessageType::ERROR, message.clone()).await;
                return BuildOutcome::NotStarted(message);
            }
        };

        let sink = ClientLog(self);
        sink.append_line(format!("Running: {invocation}")).await;
        tracing::info!(root = %root.display(), command = %invocation, "starting build");

        match run(&invocation, &root, &sink).await {
            Ok(status) if status.success() => {
                sink.append_line("Process finished with exit code 0".to_string())
                    .await;
                self.show_message(MessageType::INFO, "Build succeeded".to_string())
                    .await;
                BuildOutcome::Succeeded
            }
            Ok(status) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let message = format!("Process exited with code {code}");
                sink.append_line(message.clone()).await;
                self.show_message(MessageType::ERROR, message).await;
                BuildOutcome::Failed(status.code())
            }
            Err(e) => {
                sink.append_line(e.to_string()).await;
                let message = format!("Failed to run command: {e}");
                self.show_message(MessageType::ERROR, message.clone()).await;
                BuildOutcome::NotStarted(message)
            }
        }
    }

    /// Locate the project for the build target and compute its command line.
    async fn prepare_build(
        &self,
        target: Option<Url>,
    ) -> Result<(std::path::PathBuf, CompilerInvocation), String> {
        let uri = target
            .or_else(|| self.last_active.lock().clone())
            .ok_or_else(|| "No editor".to_string())?;
        let path = uri
            .to_file_path()
            .map_err(|_| format!("{uri} is not a file"))?;

        let context = self
            .project_context_for_file(&path)
            .await
            .map_err(|e| e.to_string())?;
        let cfg = config::load(&context).await.map_err(|e| e.to_string())?;
        let invocation = args::build(&cfg, &context);
        Ok((context.workspace_root, invocation))
    }
}
