//! Element Inspector CLI
//!
//! Runs the history server, inspects elements of live pages, and analyzes
//! saved DOM snapshots.

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use element_inspector::dom::load_snapshot;
use element_inspector::server::{self, ServerConfig};
use element_inspector::{BrowserSession, DomTree, ElementSelected, InspectionSession, LaunchOptions, Reporter};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "element-inspector")]
#[command(version)]
#[command(about = "Inspect DOM elements and keep a history of selections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the history server with its dashboard
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, short = 'p', default_value = "3000")]
        port: u16,

        /// SQLite database file
        #[arg(long, value_name = "FILE", default_value = "element_history.db")]
        database: PathBuf,

        /// Rows to keep in the database (0 keeps everything)
        #[arg(long, default_value = "1000")]
        retention: usize,

        /// Rows sent to viewers on connect
        #[arg(long, default_value = "10")]
        history_limit: usize,
    },

    /// Open a page, select an element and report it
    Inspect {
        /// Page to open
        url: String,

        /// CSS selector of the element to select
        #[arg(long, short = 's')]
        selector: String,

        /// History server WebSocket to report to (e.g. ws://127.0.0.1:3000/ws)
        #[arg(long, value_name = "URL")]
        server: Option<String>,

        /// Launch browser in headed mode (default: headless)
        #[arg(long, short = 'H')]
        headed: bool,

        /// Path to custom browser executable
        #[arg(long, value_name = "PATH")]
        executable_path: Option<PathBuf>,
    },

    /// Analyze an element of a saved DOM snapshot
    Analyze {
        /// JSON snapshot produced by the DOM extraction script
        snapshot: PathBuf,

        /// CSS selector of the element to analyze
        #[arg(long, short = 's')]
        selector: String,

        /// URL to record in the selection
        #[arg(long, default_value = "about:blank")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            host,
            port,
            database,
            retention,
            history_limit,
        } => {
            let config = ServerConfig {
                host,
                port,
                database,
                history_limit,
                retention: (retention > 0).then_some(retention),
            };

            eprintln!("Element Inspector v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("Database: {}", config.database.display());
            eprintln!("Dashboard: http://{}:{}/", config.host, config.port);

            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Shutting down...");
                }
                signal.cancel();
            });

            server::serve(config, shutdown).await?;
        }
        Command::Inspect {
            url,
            selector,
            server,
            headed,
            executable_path,
        } => {
            let mut options = LaunchOptions::new().headless(!headed);
            options.chrome_path = executable_path;

            eprintln!("Browser mode: {}", if headed { "headed" } else { "headless" });

            let selected = tokio::task::spawn_blocking(move || -> anyhow::Result<ElementSelected> {
                let browser = BrowserSession::launch(options)?;
                browser.navigate(&url)?;
                let tree = browser.extract_document()?;
                let page_url = browser.current_url()?;
                select(&tree, &selector, &page_url)
            })
            .await??;

            println!("{}", serde_json::to_string_pretty(&selected)?);

            if let Some(server) = server {
                let mut reporter = Reporter::new(server);
                reporter.report(&selected).await.context("Failed to report selection")?;
                reporter.close().await;
                eprintln!("Reported to {}", reporter.url());
            }
        }
        Command::Analyze {
            snapshot,
            selector,
            url,
        } => {
            let json = std::fs::read_to_string(&snapshot)
                .with_context(|| format!("Failed to read {}", snapshot.display()))?;
            let tree = load_snapshot(&json)?;
            let selected = select(&tree, &selector, &url)?;
            println!("{}", serde_json::to_string_pretty(&selected)?);
        }
    }

    Ok(())
}

/// Run one inspection session that hovers then selects the first match
fn select(tree: &DomTree, selector: &str, url: &str) -> anyhow::Result<ElementSelected> {
    let node = tree
        .query_selector(selector)?
        .ok_or_else(|| anyhow!("No element matches '{}'", selector))?
        .node_id();

    let mut session = InspectionSession::new();
    session.start()?;
    let hover = session.hover(tree, node)?;
    eprintln!("Selected {}", hover.label);

    Ok(session.select(tree, node, url)?)
}
