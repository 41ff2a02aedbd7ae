//! Ballast daemon: entry point for the weighted vote ledger.

use std::path::PathBuf;

use anyhow::{bail, Context};
use ballast_service::{BallastService, ServiceConfig};
use ballast_utils::{init_logging, LogFormat};
use clap::Parser;

#[derive(Parser)]
#[command(name = "ballast-daemon", about = "Weighted vote ledger and aggregation service")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, env = "BALLAST_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for ledger storage.
    #[arg(long, env = "BALLAST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, env = "BALLAST_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLAST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BALLAST_LOG_FORMAT")]
    log_format: Option<String>,

    /// Key required in the x-admin-key header.
    #[arg(long, env = "BALLAST_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    /// API key substituted into chain RPC URLs.
    #[arg(long, env = "BALLAST_RPC_API_KEY", hide_env_values = true)]
    rpc_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the HTTP API until SIGINT/SIGTERM.
    Serve {
        /// Also run reweigh batches on the configured interval.
        #[arg(long)]
        reweigh: bool,
    },
    /// Run reweigh batches against the ledger.
    Reweigh {
        /// Keep running batches on the configured interval until interrupted.
        #[arg(long = "loop")]
        run_loop: bool,
    },
    /// Manage proposals.
    Proposal {
        #[command(subcommand)]
        action: ProposalAction,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(clap::Subcommand)]
enum ProposalAction {
    /// Create a proposal and print it as JSON.
    Create {
        #[arg(long)]
        description: String,
        /// Allowed option; repeat for each (e.g. --option YES --option NO).
        #[arg(long = "option", required = true)]
        options: Vec<String>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            ServiceConfig::from_toml_file(&path).with_context(|| format!("loading {path}"))?
        }
        None => ServiceConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(port) = cli.rpc_port {
        config.rpc_port = port;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = match format.to_lowercase().as_str() {
            "human" => LogFormat::Human,
            "json" => LogFormat::Json,
            other => bail!("unknown log format '{other}' (expected human or json)"),
        };
    }
    if cli.admin_key.is_some() {
        config.admin_key = cli.admin_key.clone();
    }
    if cli.rpc_api_key.is_some() {
        config.rpc_api_key = cli.rpc_api_key.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Serve { reweigh } => {
            config.reweigh.enabled |= reweigh;
            tracing::info!(
                port = config.rpc_port,
                data_dir = %config.data_dir.display(),
                reweigh = config.reweigh.enabled,
                "starting ballast"
            );
            let service = BallastService::build(config)?;
            service.run().await?;
            tracing::info!("ballast exited cleanly");
        }
        Command::Reweigh { run_loop } => {
            let service = BallastService::build(config)?;
            if run_loop {
                let interval =
                    std::time::Duration::from_secs(service.config().reweigh.interval_secs.max(1));
                let controller = service.shutdown_controller().clone();
                let rx = controller.subscribe();
                let signals = tokio::spawn(async move { controller.wait_for_signal().await });
                service
                    .scheduler()
                    .run_loop(interval, rx, |report| {
                        tracing::debug!(?report, "batch done");
                    })
                    .await;
                signals.abort();
            } else {
                let report = service.scheduler().run_batch().await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Proposal {
            action:
                ProposalAction::Create {
                    description,
                    options,
                },
        } => {
            let service = BallastService::build(config)?;
            let proposal = service.ledger().create_proposal(&description, &options).await?;
            println!("{}", serde_json::to_string_pretty(&proposal)?);
        }
        Command::Config => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_defaults() {
        let cli = Cli::parse_from([
            "ballast-daemon",
            "--rpc-port",
            "9000",
            "--log-format",
            "json",
            "--admin-key",
            "secret",
            "serve",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.rpc_port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.admin_key.as_deref(), Some("secret"));
    }

    #[test]
    fn unknown_log_format_is_an_error() {
        let cli = Cli::parse_from(["ballast-daemon", "--log-format", "xml", "config"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn proposal_create_requires_options() {
        assert!(Cli::try_parse_from(["ballast-daemon", "proposal", "create", "--description", "d"]).is_err());
        let cli = Cli::try_parse_from([
            "ballast-daemon", "proposal", "create", "--description", "d", "--option", "YES", "--option", "NO",
        ])
        .unwrap();
        match cli.command {
            Command::Proposal {
                action: ProposalAction::Create { options, .. },
            } => assert_eq!(options, vec!["YES", "NO"]),
            _ => panic!("expected proposal create"),
        }
    }
}
