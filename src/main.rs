use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

mod app;
mod config;
mod error;
mod event_loop;
mod input;
pub mod models;
mod stream;
mod sync;
pub mod utils;
mod view;

use config::{Config, Overrides, Settings};
use models::ResourceKind;
use stream::WebSocketConnector;
use sync::SyncContext;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dashboard backend, e.g. http://localhost:8080
    #[arg(long, env = "KUBESYNC_SERVER", global = true)]
    server: Option<String>,

    #[arg(long, env = "KUBESYNC_SESSION_ID", global = true)]
    session_id: Option<String>,

    /// Config file [default: <config dir>/kubesync/config.json]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs here instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch a live list of resources of one kind
    List {
        kind: ResourceKind,
        #[arg(short, long, env = "KUBESYNC_NAMESPACE")]
        namespace: Option<String>,
        /// Only show names containing this text
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Follow the logs of one container
    Logs {
        pod: String,
        container: String,
        #[arg(short, long, env = "KUBESYNC_NAMESPACE")]
        namespace: Option<String>,
    },
}

fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

fn init_tracing(log_file: Option<&Path>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("kubesync=info,tungstenite=warn,tokio_tungstenite=warn")
    });

    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false)
                    .init();
                return;
            }
            Err(e) => {
                eprintln!(
                    "Cannot open log file {}: {e}; logging to stderr",
                    path.display()
                );
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref());

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let namespace = match &args.command {
        Commands::List { namespace, .. } | Commands::Logs { namespace, .. } => namespace.clone(),
    };
    let settings = Settings::resolve(
        config,
        Overrides {
            server: args.server,
            session_id: args.session_id,
            namespace,
        },
    )?;
    tracing::info!(server = %settings.endpoint, session = ?settings.session, "starting");

    let (event_tx, event_rx) = unbounded_channel();
    let (notice_tx, notice_rx) = unbounded_channel();
    let ctx = SyncContext {
        endpoint: settings.endpoint,
        session: settings.session,
        connector: Arc::new(WebSocketConnector),
        events: event_tx,
        notices: notice_tx,
    };

    let mut stdout = io::stdout();
    let mut app = app::App::new(ctx, settings.namespace, settings.log_buffer_limit);
    app.clear_screen = stdout.is_terminal();

    match args.command {
        Commands::List { kind, filter, .. } => {
            app.filter_query = filter;
            app.start_list(kind);
        }
        Commands::Logs { pod, container, .. } => app.start_logs(&pod, &container),
    }

    event_loop::run(&mut stdout, app, event_rx, notice_rx).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("kubesync.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn log_file_under_a_regular_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        assert!(open_log_file(&blocker.join("kubesync.log")).is_err());
    }
}
