//! OpenAPI Mock Server - CLI Entry Point

use anyhow::Result;
use clap::Parser;
use openapi_mock_server::{bootstrap, build_router, load_spec, serve, MockServerConfig};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "openapi-mock-server",
    about = "Mock HTTP server generated from an OpenAPI document",
    version
)]
struct Args {
    /// Path to the OpenAPI document (.yaml, .yml or .json)
    #[arg(long, required_unless_present = "print_config")]
    spec: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print sample configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate the spec and configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        let default_config = include_str!("../demos/default-config.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    let Some(spec_path) = args.spec else {
        anyhow::bail!("--spec is required");
    };

    info!(path = %spec_path.display(), "Loading OpenAPI spec");
    let spec = load_spec(&spec_path)?;

    // Load configuration
    let config = MockServerConfig::load(args.config.as_deref(), args.validate)?;

    let overrides = config.overrides.len();
    let engine = bootstrap(&spec, config)?;

    if args.validate {
        println!(
            "Spec is valid ({} endpoints, {} overrides)",
            engine.defaults().len(),
            overrides
        );
        return Ok(());
    }

    let router = build_router(engine);
    let listener = TcpListener::bind(SocketAddr::new(args.bind, args.port)).await?;
    serve(listener, router).await?;

    Ok(())
}
