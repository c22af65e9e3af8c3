use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use mpl_lsp::settings::{self, SettingsScope};
use mpl_lsp::{Backend, args, config, definition, project};

/// Language server for MPL projects.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Log filter (e.g. `debug`, `mpl_lsp=trace`); `RUST_LOG` wins when set.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the Language Server Protocol on stdin/stdout (the default).
    Serve,
    /// Print the compiler invocation for the project owning FILE.
    Args { file: PathBuf },
    /// Print every resolved definition of SYMBOL as `path:line:column`.
    Definition { file: PathBuf, symbol: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve().await;
            ExitCode::SUCCESS
        }
        Command::Args { file } => print_args(&absolute(&file)).await,
        Command::Definition { file, symbol } => print_definitions(&absolute(&file), &symbol).await,
    }
}

async fn serve() {
    tracing::info!("starting MPL language server");
    let (service, socket) = LspService::new(Backend::new);
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
    tracing::info!("MPL language server stopped");
}

/// Project discovery walks ancestors, so relative arguments are anchored to
/// the current directory first.
fn absolute(file: &Path) -> PathBuf {
    std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf())
}

/// Settings for offline commands: only the user settings file applies.
fn offline_settings() -> Arc<SettingsScope> {
    let user = settings::user_settings_path()
        .map(|path| settings::load_user_settings(&path))
        .unwrap_or(serde_json::Value::Null);
    Arc::new(SettingsScope::from_layers([user]))
}

async fn print_args(file: &Path) -> ExitCode {
    let context = match project::locate(file, offline_settings()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match config::load(&context).await {
        Ok(cfg) => {
            for arg in args::build(&cfg, &context).as_slice() {
                println!("{arg}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn print_definitions(file: &Path, symbol: &str) -> ExitCode {
    let context = match project::locate(file, offline_settings()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let folders = std::env::current_dir().into_iter().collect::<Vec<_>>();
    let locations = definition::lookup(&context, &folders, symbol).await;
    if locations.is_empty() {
        eprintln!("no definition found for {symbol}");
        return ExitCode::FAILURE;
    }
    for loc in &locations {
        println!("{}:{}:{}", loc.path.display(), loc.line + 1, loc.column + 1);
    }
    ExitCode::SUCCESS
}
