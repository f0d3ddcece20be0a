//! Ladder CLI
//!
//! Command-line tools for the Ladder 4-over-6 tunnel client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ladder_engine::mock::{MockEngine, MockNetworkStack};
use ladder_engine::{
    bootstrap, spawn_renderer, Config, CounterSnapshot, DisplaySnapshot, InterfaceConfigurator,
    LogPresentation, SessionController,
};
use ladder_tun::InterfaceConfig;

/// Ladder - 4-over-6 tunnel client tools
#[derive(Parser)]
#[command(name = "ladder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ladder.toml")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sample configuration file
    GenConfig {
        /// Output path for the configuration file
        #[arg(short, long, default_value = "ladder.toml")]
        output: PathBuf,
    },

    /// Load and validate the configuration file
    CheckConfig,

    /// Show the interface configuration a bootstrap line would produce
    Bootstrap {
        /// Line in the form "<fd> <ipv4> <gateway> [dns...]"
        line: String,
    },

    /// Render a counter line as status text
    Counters {
        /// Eight whitespace-separated counters
        line: String,

        /// Seconds since the session started
        #[arg(short, long, default_value_t = 0)]
        uptime: u64,
    },

    /// Run a session against a scripted engine until interrupted
    Simulate {
        /// Bootstrap line the engine answers with
        #[arg(long, default_value = "37 10.0.0.2 10.0.0.1 8.8.8.8 8.8.4.4")]
        bootstrap: String,

        /// Counter line the engine reports on every poll
        #[arg(long, default_value = "1000 10 500 5 2000 20 800 4")]
        counters: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config-backed commands take their log level from the file unless overridden
    let config = match cli.command {
        Commands::CheckConfig | Commands::Simulate { .. } => Some(load_config(&cli.config)?),
        _ => None,
    };
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    match cli.command {
        Commands::GenConfig { output } => generate_config(output),
        Commands::CheckConfig => check_config(&cli.config, config),
        Commands::Bootstrap { line } => show_bootstrap(&line),
        Commands::Counters { line, uptime } => show_counters(&line, uptime),
        Commands::Simulate {
            bootstrap,
            counters,
        } => simulate(config, &bootstrap, &counters).await,
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: &PathBuf) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load configuration from {:?}", path))
}

fn generate_config(output: PathBuf) -> Result<()> {
    let sample = Config::sample();

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write configuration to {:?}", output))?;

    info!("Generated sample configuration at {:?}", output);
    println!("Sample configuration written to {:?}", output);
    println!("\nEdit the server address and port before running.");

    Ok(())
}

fn check_config(path: &PathBuf, config: Option<Config>) -> Result<()> {
    let config = match config {
        Some(config) => config,
        None => load_config(path)?,
    };
    let policy = config.interface_policy();

    println!("Configuration {:?} is valid", path);
    println!("  server:    [{}]:{}", config.server.address, config.server.port);
    println!("  mtu:       {}", policy.mtu);
    println!("  session:   {}", policy.session_name);
    println!(
        "  telemetry: every {} ms",
        config.telemetry_config().interval.as_millis()
    );

    if !config.server.is_ipv6() {
        warn!("Server address {} is not IPv6", config.server.address);
    }

    Ok(())
}

fn show_bootstrap(line: &str) -> Result<()> {
    let response = bootstrap::parse(line).context("Invalid bootstrap line")?;
    let configurator = InterfaceConfigurator::new(Arc::new(MockNetworkStack::new()));
    let config = configurator
        .build_config(&response)
        .context("Failed to build interface configuration")?;

    println!("guarded socket: {}", response.guarded_socket_fd);
    print_interface(&config);

    Ok(())
}

fn print_interface(config: &InterfaceConfig) {
    for address in &config.addresses {
        println!("address:        {}", address);
    }
    for route in &config.routes {
        println!("route:          {}", route);
    }
    for dns in &config.dns_servers {
        println!("dns:            {}", dns);
    }
    println!("mtu:            {}", config.mtu);
    println!("session:        {}", config.session);
}

fn show_counters(line: &str, uptime: u64) -> Result<()> {
    let counters: CounterSnapshot = line.parse().context("Invalid counter line")?;
    println!("{}", DisplaySnapshot::from_counters(&counters, uptime));
    Ok(())
}

async fn simulate(config: Option<Config>, bootstrap: &str, counters: &str) -> Result<()> {
    let config = config.context("Configuration is required")?;

    let engine = Arc::new(MockEngine::new());
    engine.set_bootstrap(bootstrap);
    engine.set_counters(counters);

    let controller = Arc::new(
        SessionController::new(engine, Arc::new(MockNetworkStack::new()))
            .with_policy(config.interface_policy())
            .with_telemetry(config.telemetry_config()),
    );
    let renderer = spawn_renderer(Arc::new(LogPresentation), controller.subscribe());

    controller
        .start(&config.server.address, config.server.port)
        .await
        .context("Failed to start session")?;

    wait_for_shutdown().await?;

    info!("Shutting down session...");
    controller.stop().await;
    drop(controller);

    // The renderer exits once the controller's publisher is gone
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), renderer).await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to register SIGTERM handler")?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .context("Failed to register SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
