use anyhow::{anyhow, Result};
use api::{start_server_with_config, ApiConfig};
use clap::Parser;
use impersonation_server::{build_state, init_logging, log_shutdown, Args};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before parsing so env-backed arguments see it
    dotenv::dotenv().ok();
    let args = Args::parse();

    let _guard = init_logging(&args.log_dir)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let state = build_state(&args)?;
    let result = start_server_with_config(state, ApiConfig::new().with_port(args.port))
        .await
        .map_err(|e| anyhow!("API server error: {}", e));

    log_shutdown();
    result
}
