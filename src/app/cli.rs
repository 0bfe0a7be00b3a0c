use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::app::config::ProxyConfig;
use crate::rpc::server::ProxyServer;
use crate::utils::logging::init_logging;

/// Signing JSON-RPC proxy.
#[derive(Parser)]
#[clap(name = "signer-provider", version)]
pub struct Cli {
    /// Path to the TOML config file
    #[clap(long, default_value = "./signer-provider.toml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Serve the proxy
    Run {
        /// listen address (host:port), overrides `bind`
        #[clap(long)]
        bind: Option<SocketAddr>,

        /// upstream JSON-RPC url, overrides `upstream`
        #[clap(long)]
        upstream: Option<String>,
    },
    /// Validate the config file and exit
    Check,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = ProxyConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.cmd {
        Cmd::Check => {
            let provider = cfg.build_provider()?;
            println!(
                "config ok: upstream {} capabilities {:?}",
                cfg.upstream,
                provider.capabilities().present()
            );
            Ok(())
        }
        Cmd::Run { bind, upstream } => {
            if let Some(b) = bind {
                cfg.bind = b;
            }
            if let Some(u) = upstream {
                cfg.upstream = u;
                cfg.validate()?;
            }
            init_logging(&cfg.log_level);

            let provider = cfg.build_provider()?;
            info!(upstream = %cfg.upstream, signer = %cfg.signer.url, "provider ready");
            ProxyServer::new(cfg.bind, provider).serve().await?;
            info!("proxy stopped");
            Ok(())
        }
    }
}
