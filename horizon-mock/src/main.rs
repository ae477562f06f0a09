/// Horizon Mock Server
///
/// Standalone in-memory Horizon for manual testing of the account viewer.
/// Optionally seeds one funded account from `SEED_ACCOUNT`.
use anyhow::{Context, Result};
use std::env;

use horizon_mock::{run_server, MockLedger};

#[derive(Debug)]
struct Config {
    server_host: String,
    server_port: u16,
    seed_account: Option<String>,
    seed_balance: String,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        Ok(Self {
            server_host,
            server_port,
            seed_account: env::var("SEED_ACCOUNT").ok(),
            seed_balance: env::var("SEED_BALANCE").unwrap_or_else(|_| "10000.0000000".to_string()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().context("Failed to load configuration")?;
    log::info!(
        "Server will listen on {}:{}",
        config.server_host,
        config.server_port
    );

    let ledger = MockLedger::new();
    if let Some(account) = &config.seed_account {
        ledger.add_account(account, &config.seed_balance, 1).await;
        log::info!("Seeded {} with {}", account, config.seed_balance);
    }

    run_server(ledger, config.server_host, config.server_port)
        .await
        .context("Server error")?;

    Ok(())
}
