//! Binary entry point for the mcp-gdrive MCP server.

use anyhow::Context;
use clap::Parser;
use mcp_gdrive::{Config, GDriveServer, cache::DiskCache, folder::DEFAULT_FOLDER_NAME};
use rmcp::ServiceExt;
use std::path::PathBuf;

/// Google Drive MCP Server — Drive and Sheets tools confined to one managed folder.
#[derive(Parser)]
#[command(name = "mcp-gdrive", version, about)]
struct Cli {
    /// OAuth access token for the Drive and Sheets APIs.
    #[arg(long, env = "GDRIVE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Name of the managed folder in Drive.
    #[arg(long, env = "GDRIVE_MCP_FOLDER", default_value = DEFAULT_FOLDER_NAME)]
    folder_name: String,

    /// File caching the managed folder id between runs [default: ~/.mcp-gdrive-folder-id].
    #[arg(long, env = "GDRIVE_MCP_FOLDER_CACHE")]
    cache_file: Option<PathBuf>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            access_token: cli.access_token,
            folder_name: cli.folder_name,
            cache_file: cli.cache_file.unwrap_or_else(DiskCache::default_path),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }
    let config = Config::from(Cli::parse());
    tracing::debug!(?config, "starting mcp-gdrive");
    let server = GDriveServer::from_config(config);
    let transport = rmcp::transport::stdio();
    server
        .serve(transport)
        .await
        .context("failed to start server")?
        .waiting()
        .await
        .context("server error")?;
    Ok(())
}
