#![allow(dead_code)]

/// Common test utilities for account viewer integration tests
///
/// Each test gets its own in-process Horizon mock on an ephemeral port, a
/// temporary storage directory and a manual clock, so tests never touch the
/// network or each other.
use std::sync::Arc;

use account_viewer::{
    FileStore, HorizonClient, HttpFederationResolver, Keypair, ManualClock, Session, SessionParts,
    ViewerConfig,
};
use account_viewer::directory::{DirectoryClient, DirectorySource};
use horizon_mock::MockLedger;
use tempfile::TempDir;

/// 2023-11-14T22:13:20Z
pub const START_MILLIS: i64 = 1_700_000_000_000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic keypair from a one-byte seed
pub fn keypair(seed: u8) -> Keypair {
    Keypair::from_seed_bytes([seed; 32])
}

pub struct TestEnv {
    pub temp_dir: TempDir,
    pub ledger: MockLedger,
    pub base_url: String,
    pub clock: ManualClock,
    pub session: Session<HorizonClient>,
}

impl TestEnv {
    pub async fn new() -> anyhow::Result<Self> {
        init_logger();
        let ledger = MockLedger::new();
        let addr = horizon_mock::spawn(ledger.clone()).await?;
        let base_url = format!("http://{}", addr);
        let temp_dir = TempDir::new()?;
        let clock = ManualClock::new(START_MILLIS);

        let session = build_session(&base_url, &base_url, &temp_dir, &clock)?;
        log::info!("Test environment on {}", base_url);

        Ok(Self {
            temp_dir,
            ledger,
            base_url,
            clock,
            session,
        })
    }

    pub fn config(&self) -> ViewerConfig {
        test_config(&self.base_url, &self.base_url, &self.temp_dir)
    }

    /// A second session sharing this environment's storage directory
    pub fn reopen(&self) -> anyhow::Result<Session<HorizonClient>> {
        build_session(&self.base_url, &self.base_url, &self.temp_dir, &self.clock)
    }
}

pub fn test_config(horizon_url: &str, directory_url: &str, temp_dir: &TempDir) -> ViewerConfig {
    let mut config = ViewerConfig::default();
    config.horizon_url = horizon_url.to_string();
    config.directory_url = directory_url.to_string();
    config.storage_dir = temp_dir.path().to_path_buf();
    config.federation_scheme = "http".to_string();
    config
}

pub fn build_session(
    horizon_url: &str,
    directory_url: &str,
    temp_dir: &TempDir,
    clock: &ManualClock,
) -> anyhow::Result<Session<HorizonClient>> {
    let directory = DirectoryClient::new(directory_url)?;
    build_session_with_directory(horizon_url, temp_dir, clock, Box::new(directory))
}

/// Session whose directory lists come from `directory` instead of HTTP
pub fn build_session_with_directory(
    horizon_url: &str,
    temp_dir: &TempDir,
    clock: &ManualClock,
    directory: Box<dyn DirectorySource>,
) -> anyhow::Result<Session<HorizonClient>> {
    let config = test_config(horizon_url, horizon_url, temp_dir);
    let parts = SessionParts {
        storage: Arc::new(FileStore::new(config.storage_dir.clone())),
        directory,
        federation: Arc::new(HttpFederationResolver::new(&config.federation_scheme)),
        clock: Arc::new(clock.clone()),
    };
    let ledger = HorizonClient::from_config(&config);
    Ok(Session::new(config, ledger, parts))
}
