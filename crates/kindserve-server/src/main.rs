//! `kindserve`: serves the demo API group over HTTP.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KINDSERVE_CONFIG` | *(none)* | Config file, same as `--config`. |
//! | `KINDSERVE_LISTEN` | *(from config)* | Listen address, same as `--listen`. |
//! | `KINDSERVE_LISTEN_ADDRESS` | `0.0.0.0:8080` | Overrides `listen_address` in the file. |
//! | `RUST_LOG` | `kindserve_server=info` | Log filter. |

use clap::Parser;
use kindserve_server::{
    codec::JsonCodec, config::ServerConfig, demo, server::RestServer, store::InMemoryStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kindserve", version, about = "Generic CRUD REST server for typed resource kinds")]
struct Cli {
    /// Configuration file (yaml, toml or json)
    #[arg(short, long, env = "KINDSERVE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(short, long, env = "KINDSERVE_LISTEN")]
    listen: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "kindserve_server=debug"
    } else {
        "kindserve_server=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listen_address = listen;
    }
    config.ignored_kinds.extend(demo::ignored_kinds());

    let scheme = Arc::new(demo::scheme()?);
    let store = Arc::new(InMemoryStore::new());
    demo::seed(store.as_ref(), &scheme).await?;

    let mut server = RestServer::new(
        config,
        scheme.clone(),
        store,
        Arc::new(JsonCodec::new(scheme)),
    );
    demo::register_hooks(server.api_groups_mut());

    info!(
        group_versions = ?server.api_groups().group_version_names(),
        "starting kindserve"
    );
    server.listen().await?;
    Ok(())
}
