use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use camstream::{camera, CamstreamConfig, FrameSource, StreamServer};

#[derive(Parser, Debug)]
#[command(name = "camstream")]
#[command(about = "Multi-client MJPEG streaming server for a single camera")]
#[command(version)]
#[command(long_about = "Serves a single exclusive-access camera as a live MJPEG feed over \
multipart HTTP. Any number of viewers can connect; capture calls are serialized over the \
shared device. Any non-stream request receives a built-in HTML viewer page.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "camstream.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the server")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting camstream v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match CamstreamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate()?;

    // Device init failure is fatal; the server must not start serving
    // traffic without a working camera.
    let device = camera::default_device(&config.camera);
    let source = match FrameSource::initialize(device).await {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!("Failed to initialize camera: {}", e);
            return Err(e.into());
        }
    };

    source
        .warm_up(config.camera.warmup_frames, config.camera.warmup_interval())
        .await;

    let server = StreamServer::bind(&config, Arc::clone(&source)).await?;
    info!(
        "Stream URL: http://{}/stream",
        server.local_addr().map(|a| a.to_string()).unwrap_or_default()
    );

    let result = server.serve().await;

    source.shutdown().await;
    result.map_err(Into::into)
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("camstream={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Camstream Configuration File");
    println!("# This is the default configuration with all available options");
    println!();
    println!("{}", toml::to_string_pretty(&CamstreamConfig::default())?);
    Ok(())
}
