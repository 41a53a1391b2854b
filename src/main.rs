mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use decryptbox::{api, config::Config, observability};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let logs = observability::init_tracing(observability::BOOTSTRAP_FILTER);

    match cli.command {
        Commands::Server(args) => {
            let mut config = Config::load(args.config)?;
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }

            if let Err(e) = logs.set_filter(&config.telemetry.log_filter) {
                warn!(error = %e, "could not apply telemetry.log_filter");
            }
            info!(
                bind_addr = %config.server.bind_addr,
                max_age_secs = config.cache.max_age_secs,
                key_configured = config.crypto.key.is_some(),
                "Configuration loaded"
            );

            api::run(config).await?;
        }
    }

    Ok(())
}
