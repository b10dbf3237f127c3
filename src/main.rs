use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use school_site::backend::{Backend, RestBackend};
use school_site::config;
use school_site::paths::PathEnumerator;
use school_site::queries::ContentQueries;
use school_site::sitemap;

#[derive(Debug, Parser)]
#[command(author, version, about = "Content build tools for the school website")]
struct Args {
    /// Path to YAML config file (optional; defaults apply when missing)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write sitemap.xml into the configured output directory
    Sitemap,
    /// Print every static route parameter set as JSON; fails the build on store errors
    Paths,
    /// Check that the store answers
    Health,
    /// Print published content counts as JSON
    Counts,
    /// Print an example config file
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    match args.command {
        Command::ExampleConfig => {
            print!("{}", config::example());
            Ok(())
        }
        command => run(&args.config, command).await,
    }
}

async fn run(config_path: &Path, command: Command) -> Result<()> {
    let cfg = config::load(Some(config_path))?;
    let backend: Arc<dyn Backend> = Arc::new(RestBackend::from_config(&cfg)?);
    info!(remote = %cfg.remote.url, "using content store");

    match command {
        Command::Sitemap => {
            let paths = PathEnumerator::new(backend);
            let out = sitemap::build_sitemap(&cfg, &paths).await?;
            println!("{}", out.display());
        }
        Command::Paths => {
            let paths = PathEnumerator::new(backend);
            let routes = paths.all_static_paths().await?;
            println!("{}", serde_json::to_string_pretty(&routes)?);
        }
        Command::Health => {
            let queries = ContentQueries::new(backend);
            if !queries.check_health().await {
                error!("content store is not reachable");
                return Err(anyhow!("content store health check failed"));
            }
            println!("ok");
        }
        Command::Counts => {
            let queries = ContentQueries::new(backend);
            let counts = queries.content_counts().await;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Command::ExampleConfig => print!("{}", config::example()),
    }

    Ok(())
}
