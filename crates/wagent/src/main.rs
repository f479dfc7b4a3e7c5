// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! wagent - AI replies and usage billing for WhatsApp business accounts.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wagent_config::WagentConfig;
use wagent_config::model::CostScheme;
use wagent_storage::Database;

/// wagent - AI replies and usage billing for WhatsApp business accounts.
#[derive(Parser, Debug)]
#[command(name = "wagent", version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the standard search path.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook gateway and the inbound and billing workers.
    Serve,
    /// Validate the configuration and print the effective settings.
    CheckConfig,
    /// Create or upgrade the database schema.
    Migrate,
}

fn load_config(path: Option<&PathBuf>) -> WagentConfig {
    let loaded = match path {
        Some(path) => wagent_config::load_and_validate_path(path),
        None => wagent_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            wagent_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Effective settings worth eyeballing, secrets reduced to set/unset.
fn describe(config: &WagentConfig) -> Vec<(&'static str, String)> {
    let set = |v: &Option<String>| if v.is_some() { "set" } else { "unset" }.to_string();
    vec![
        ("agent.name", config.agent.name.clone()),
        ("storage.database_path", config.storage.database_path.clone()),
        (
            "gateway.listen",
            format!("{}:{}", config.gateway.host, config.gateway.port),
        ),
        ("gateway.webhook_secret", set(&config.gateway.webhook_secret)),
        ("bridge.base_url", config.bridge.base_url.clone()),
        ("provider.default_vendor", config.provider.default_vendor.clone()),
        ("provider.default_model", config.provider.default_model.clone()),
        ("billing.currency", config.billing.currency.clone()),
        (
            "billing.cost_scheme",
            match config.billing.cost_scheme {
                CostScheme::PerUnitType => "per_unit_type".to_string(),
                CostScheme::Flat => "flat".to_string(),
            },
        ),
        (
            "worker.inbound_concurrency",
            config.worker.inbound_concurrency.to_string(),
        ),
    ]
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            println!("wagent: configuration is valid");
            for (key, value) in describe(&config) {
                println!("  {key:<28} {value}");
            }
        }
        Some(Commands::Migrate) => {
            let path = &config.storage.database_path;
            match Database::open_with(path, config.storage.wal_mode).await {
                Ok(db) => {
                    if let Err(e) = db.close().await {
                        eprintln!("warning: failed to close database cleanly: {e}");
                    }
                    println!("wagent: database at {path} is up to date");
                }
                Err(e) => {
                    eprintln!("error: migration failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("wagent: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["wagent", "check-config", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(Cli::try_parse_from(["wagent", "shell"]).is_err());
    }

    #[test]
    fn description_hides_secrets() {
        let mut config = wagent_config::load_and_validate_str("").unwrap();
        config.gateway.webhook_secret = Some("s3cret".into());
        let lines = describe(&config);
        assert!(lines.iter().all(|(_, v)| !v.contains("s3cret")));
        assert!(lines.contains(&("gateway.webhook_secret", "set".to_string())));
        assert!(lines.contains(&("agent.name", "wagent".to_string())));
    }
}
