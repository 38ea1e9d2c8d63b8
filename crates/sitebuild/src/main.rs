//! sitebuild CLI - assemble a static site into a deployable directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use sitebuild_static::SiteBuilder;
use tracing_subscriber::{fmt, EnvFilter};

mod config;

#[derive(Parser)]
#[command(name = "sitebuild")]
#[command(about = "Build a static site into a deployable directory")]
#[command(version)]
pub struct Cli {
    /// Path to site.toml config file, relative to --root when given
    #[arg(short, long, default_value = "site.toml")]
    config: PathBuf,

    /// Project root containing index.html and style.css
    #[arg(long)]
    root: Option<PathBuf>,

    /// Output directory, relative to the project root (defaults to config or "build")
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Deployment subdirectory name; pass "" to disable favicon URL rewriting
    #[arg(long)]
    base: Option<String>,

    /// Skip minification
    #[arg(long)]
    no_minify: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config_path = config::config_path(cli.root.as_deref(), &cli.config);
    let file_config = config::load_config(&config_path)?;
    let build_config = config::resolve(
        file_config,
        config::Overrides {
            root: cli.root,
            output: cli.output,
            base: cli.base,
            no_minify: cli.no_minify,
        },
    )?;

    let result = SiteBuilder::new(build_config).build().await;

    tracing::info!(
        "Wrote {} files in {}ms",
        result.files_written(),
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    let failures = result.errors().count();
    if failures > 0 {
        anyhow::bail!("build finished with {} error(s)", failures);
    }

    Ok(())
}
