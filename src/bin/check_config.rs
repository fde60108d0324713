//! Validate a validator configuration file
//!
//! ```text
//! check_config [--config <path>]
//! ```
//!
//! Loads and validates the YAML, initialises logging with its `logging`
//! section and prints a summary. Exits non-zero on any configuration error.

use anyhow::{Context, Result};
use tracing::info;

use bridge_validator::config::BridgeConfig;
use bridge_validator::logging::init_logging;

const DEFAULT_CONFIG: &str = "config/validator.yaml";

fn get_config_path() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    DEFAULT_CONFIG.to_string()
}

fn run(path: &str) -> Result<()> {
    let config = BridgeConfig::from_file(path).with_context(|| format!("loading {path}"))?;
    config
        .validate()
        .with_context(|| format!("validating {path}"))?;

    let _guard = init_logging(&config.logging);
    let accounts = config.accounts()?;
    let networks = config.network_registry()?;

    info!(
        path,
        bridge_account = %accounts.bridge_account,
        members = accounts.members.len(),
        treasury = %accounts.treasury,
        networks = networks.len(),
        assets = config.assets.len(),
        evm_chains = config.evm.len(),
        "Configuration valid"
    );
    println!(
        "[{}] OK: {} members, {} networks, {} asset mappings, {} EVM chains",
        env!("BRIDGE_GIT_HASH"),
        accounts.members.len(),
        networks.len(),
        config.assets.len(),
        config.evm.len()
    );
    Ok(())
}

fn main() {
    let path = get_config_path();
    if let Err(e) = run(&path) {
        eprintln!("Invalid configuration: {e:#}");
        std::process::exit(1);
    }
}
