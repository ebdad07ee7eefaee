use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use ftext_workspace::{router, Workspace};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory holding documents (overrides config)
    #[arg(short, long)]
    pub storage_dir: Option<String>,
}

pub fn serve(args: ServeArgs, cwd: &str) -> Result<()> {
    let mut config = Config::load(cwd)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(storage_dir) = args.storage_dir {
        config.storage_dir = storage_dir;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(run(config, cwd))
}

async fn run(config: Config, cwd: &str) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let workspace = Workspace::new(config.workspace_config(cwd));

    println!("{}", "🚀 Starting ftext server...".bright_blue().bold());
    println!(
        "   Storage: {}",
        workspace.config().storage_dir.display()
    );
    println!("   Listening on http://{}", addr.cyan());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, router(workspace.clone()))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    workspace.shutdown().await;
    println!("{}", "👋 Server stopped".green());
    Ok(())
}
