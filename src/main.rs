use anyhow::Result;
use clap::Parser;
use sitecheck::{
    config::{Config, WorkMode},
    output::ConsoleReporter,
    reporter::LogReporter,
    web::{start_web_server, AppState},
    ProbeEngine, Store,
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sitecheck")]
#[command(about = "Probe HTTP, TCP and ping targets for reachability and latency")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mode selector (cli or web), overrides the config file
    #[arg(short, long)]
    mode: Option<String>,

    /// Site/proxy data file, overrides the config file
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print a default config file and exit
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.generate_config {
        print!("{}", Config::generate_default_toml());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(mode) = &args.mode {
        config.main.work_mode = WorkMode::parse_flag(mode)?;
    }
    if let Some(data) = args.data {
        config.main.data_file = data;
    }
    let verbose = args.verbose || config.main.verbose;

    // Initialize logging
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("sitecheck starting...");
    let store = Arc::new(Store::open(&config.main.data_file).await?);
    info!("Using data file {}", store.path().display());

    if config.main.work_mode.contains(WorkMode::CLI) {
        run_cli_mode(&store, verbose).await;
    }
    if config.main.work_mode.contains(WorkMode::WEB) {
        run_web_server_mode(&config, store).await?;
    }

    Ok(())
}

async fn run_cli_mode(store: &Store, verbose: bool) {
    let (sites, proxy) = store.snapshot().await;
    if sites.is_empty() {
        warn!("No sites configured in {}", store.path().display());
    }

    let mut engine = ProbeEngine::new();
    engine.register_reporter(Box::new(ConsoleReporter::new(verbose)));
    engine.run(&sites, &proxy).await;
}

async fn run_web_server_mode(config: &Config, store: Arc<Store>) -> Result<()> {
    let mut engine = ProbeEngine::new();
    engine.register_reporter(Box::new(LogReporter));

    let state = AppState::new(store, engine);
    start_web_server(&config.bind_address(), state, &config.web.static_dir).await
}
