use anyhow::Result;
use clap::Parser;
use storefront_core::tracing::{config::InstrumentationConfig, init::init_tracing};
use storefront_daemon::{ServerBuilder, Settings};
use tokio::net::TcpListener;
use tracing::info;

/// Storefront API server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize instrumentation
    let instrumentation_config = InstrumentationConfig {
        service_name: "storefront-server".to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        log_level: std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "storefront_daemon=debug,storefront_http=debug,tower_http=debug".to_string()),
        ..InstrumentationConfig::from_env()
    };
    init_tracing(&instrumentation_config)?;

    let settings = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from: {}", config_path);
            Settings::load_from_file(&config_path)?
        }
        None => Settings::load()?,
    };

    let builder = ServerBuilder::new(settings);
    let listener = TcpListener::bind(builder.settings().server.bind_addr()).await?;
    let port = listener.local_addr()?.port();

    let state = builder.build_app_state(port);
    let router = builder.build_router(state);

    println!("Server is running on port {port}");

    ServerBuilder::serve(listener, router, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
        }
    })
    .await?;

    Ok(())
}
