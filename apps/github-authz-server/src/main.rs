#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod config;
mod logging;
mod server;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

/// Envoy external authorization server backed by GitHub OAuth.
#[derive(Debug, Parser)]
#[command(name = "github-authz-server", version, about)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load(cli.config.as_deref()).context("failed to load configuration")?;

    if cli.print_config {
        let rendered =
            serde_json::to_string_pretty(&cfg).context("failed to render configuration")?;
        println!("{rendered}");
        return Ok(());
    }

    logging::init(&cfg.logging)?;
    server::run(cfg).await
}
