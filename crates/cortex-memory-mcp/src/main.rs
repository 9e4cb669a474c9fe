//! cortex-memory MCP server: a stdio JSON-RPC 2.0 adapter exposing
//! `cortex-memory-core`'s persistent, rank-aware memory engine as a set of
//! MCP tools (recall, store, force_recall, export/import, ...) for a coding
//! assistant to call (spec §4.9, §5, §6).
//!
//! The database is opened once at startup, relative to the workspace root
//! given on the command line (or the current directory). A failure to open
//! storage does not crash the process — the adapter starts in "degraded
//! mode" (spec §7) so a connected client can still call `health_check`
//! rather than losing its connection outright.

mod protocol;
mod resources;
mod server;
mod tools;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use cortex_memory_core::Engine;

use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

/// cortex-memory: a persistent, rank-aware memory store for AI coding
/// assistants, spoken over MCP on stdio.
#[derive(Parser, Debug)]
#[command(name = "cortex-memory-mcp", version, about)]
struct Cli {
    /// Workspace root the memory store is scoped to. Defaults to the
    /// current directory. The database lives at
    /// `<root>/.ai/brain-data/data/cognitive.db` (spec §6).
    #[arg(long, value_name = "PATH")]
    workspace: Option<PathBuf>,
}

fn init_logging() {
    // CORTEX_DEBUG=1 appends logs to ./cortex.log instead of stderr (spec §6).
    let debug_to_file = std::env::var("CORTEX_DEBUG").as_deref() == Ok("1");

    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());

    if debug_to_file {
        if let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open("cortex.log") {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(file).with_target(false).with_ansi(false).init();
            return;
        }
    }

    // Standard output is reserved for JSON-RPC frames (spec §4.9): logs
    // always go to standard error, never standard output.
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).with_ansi(false).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let workspace_root = cli.workspace.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    info!("cortex-memory-mcp v{} starting (workspace: {})", env!("CARGO_PKG_VERSION"), workspace_root.display());

    let (server, shutdown_handle) = match Engine::new(workspace_root) {
        Ok(engine) => {
            info!("storage initialized");
            let engine = Arc::new(engine);
            (McpServer::new(engine.clone()), Some(engine))
        }
        Err(e) => {
            // A corrupt file or unwritable parent directory is the only
            // fatal failure mode here (spec §4.1, §7); we do not exit,
            // because that would drop the client's connection silently.
            error!("storage failed to initialize, starting in degraded mode: {}", e);
            (McpServer::degraded(e.to_string()), None)
        }
    };

    // The database handle is released on SIGINT/SIGTERM/stdin EOF, flushing
    // WAL via checkpoint (spec §5 scoped resources).
    if let Some(engine) = shutdown_handle.clone() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received interrupt, checkpointing before exit");
                let _ = engine.shutdown();
                std::process::exit(0);
            }
        });
    }

    let transport = StdioTransport::new();
    info!("listening on stdio");

    let run_result = transport.run(server).await;

    if let Some(engine) = shutdown_handle {
        let _ = engine.shutdown();
    }

    if let Err(e) = run_result {
        error!("transport error: {}", e);
        std::process::exit(1);
    }

    info!("cortex-memory-mcp shutting down");
}
