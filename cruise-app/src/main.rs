use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cruise_common::observability::{init_logging, LogConfig};
use cruise_config::CruiseConfigLoader;
use cruise_drivers::browser::CruiseDriver;
use cruise_engine::Engine;
use tracing::info;

mod console;

/// Autopilot for embedded interactive training modules.
#[derive(Debug, Parser)]
#[command(name = "cruise", version)]
struct Cli {
    /// Configuration file (YAML); missing files fall back to defaults.
    #[arg(long, default_value = "cruise.yaml")]
    config: PathBuf,

    /// Module URL to open before the engine starts.
    #[arg(long)]
    url: Option<String>,

    /// Run the browser without a visible window.
    #[arg(long)]
    headless: bool,

    /// WebDriver endpoint override.
    #[arg(long)]
    webdriver: Option<String>,

    /// Duplicate log output to stderr.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging(LogConfig {
        emit_stderr: cli.verbose,
        ..LogConfig::default()
    })?;

    let mut config = CruiseConfigLoader::new().with_file(&cli.config).load()?;
    if let Some(url) = cli.url {
        config.driver.target_url = Some(url);
    }
    if let Some(webdriver) = cli.webdriver {
        config.driver.webdriver_url = webdriver;
    }
    config.driver.headless |= cli.headless;

    info!(log = %log_path.display(), "cruise starting");

    let driver = CruiseDriver::connect(&config.driver, config.engine.stealth).await?;
    if let Some(url) = &config.driver.target_url {
        driver.goto(url).await?;
    }

    let engine = Engine::new(
        Arc::new(driver.into_host()),
        config.engine,
        config.lexicons,
        config.completion,
    );
    engine.start();

    console::run(engine).await
}
