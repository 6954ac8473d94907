//! Pluggi: plugin host runner
//!
//! Loads configuration, registers the configured plugins and runs the
//! configured lifecycle phases in order.

use tracing_subscriber::{EnvFilter, fmt};

use pluggi_core::config::AppConfig;
use pluggi_core::error::AppError;
use pluggi_plugin::HostBuilder;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` files and `PLUGGI__*` variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("PLUGGI_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Pluggi v{}", env!("CARGO_PKG_VERSION"));

    let mut host = HostBuilder::from_config(&config).build()?;
    tracing::info!(host = %host.id(), phases = ?host.phases(), "Host ready");

    for name in &config.plugins.load {
        host.plugin(name.as_str())?;
    }
    tracing::info!("{} plugin(s) registered", host.len());

    for phase in &config.host.run {
        tracing::info!(phase = %phase, "Running phase");
        host.invoke(phase, None).await?;
    }

    tracing::info!("All phases completed");
    Ok(())
}
