// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `graph-client` command line.
//!
//! ```text
//! graph-client connect <target> [alias]
//! graph-client disconnect <target>
//! graph-client set-alias <target> <alias>
//! graph-client followings
//! graph-client reset-device
//! ```
//!
//! Client settings come from the environment (see `config`). The wallet is a
//! local Ethereum key read from `--wallet-key` / `WALLET_KEY_PATH`; the device
//! signing key lives in `--key-store-dir` / `KEY_STORE_DIR`. Passing
//! `--mirror-db` / `MIRROR_DB_PATH` mirrors follows into a redb file.
//!
//! Usage errors exit with status 2, failed commands with status 1.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use relational_graph_client::config::{
    DEFAULT_KEY_STORE_DIR, KEY_STORE_DIR_ENV, MIRROR_DB_PATH_ENV, WALLET_KEY_PATH_ENV,
};
use relational_graph_client::keys::FileKeyStore;
use relational_graph_client::logging::init_tracing;
use relational_graph_client::mirror::{MirrorStore, PkhIdentityProvider, RedbDocumentStore};
use relational_graph_client::wallet::{LocalEthereumSigner, WalletProvider};
use relational_graph_client::{ClientConfig, ConnectError, GraphClient, MutationOutcome};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "graph-client")]
#[command(about = "Follow, unfollow and alias accounts on the social graph", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// PEM file holding the local Ethereum wallet key
    #[arg(long, global = true, env = WALLET_KEY_PATH_ENV)]
    wallet_key: Option<PathBuf>,

    /// Directory of the device signing key store
    #[arg(long, global = true, env = KEY_STORE_DIR_ENV, default_value = DEFAULT_KEY_STORE_DIR)]
    key_store_dir: PathBuf,

    /// redb file for the follow-list mirror (disabled when unset)
    #[arg(long, global = true, env = MIRROR_DB_PATH_ENV)]
    mirror_db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Follow an account
    Connect {
        /// Address to follow
        target: String,

        /// Optional alias for the followed account
        #[arg(default_value = "")]
        alias: String,
    },

    /// Unfollow an account
    Disconnect {
        /// Address to unfollow
        target: String,
    },

    /// Set the alias of a followed account
    SetAlias {
        /// Followed address
        target: String,

        /// New alias
        alias: String,
    },

    /// Print the follow list recorded in the mirror
    Followings,

    /// Delete the device signing key
    ResetDevice,
}

async fn build_client(cli: &Cli) -> Result<GraphClient, ConnectError> {
    let config = ClientConfig::from_env()?;

    let key_path = cli
        .wallet_key
        .as_ref()
        .ok_or_else(|| ConnectError::Config(format!("{WALLET_KEY_PATH_ENV} is required")))?;
    let pem = tokio::fs::read(key_path).await.map_err(|e| {
        ConnectError::Config(format!("failed to read {}: {e}", key_path.display()))
    })?;
    let wallet = WalletProvider::ethereum(LocalEthereumSigner::from_pem(&pem)?);

    let mut builder = GraphClient::builder(config)
        .wallet(wallet)
        .key_store(Arc::new(FileKeyStore::new(&cli.key_store_dir)));

    if let Some(db_path) = &cli.mirror_db {
        let documents =
            RedbDocumentStore::open(db_path).map_err(|e| ConnectError::Mirror(e.to_string()))?;
        builder = builder.mirror(MirrorStore::new(
            Arc::new(PkhIdentityProvider),
            Arc::new(documents),
        ));
        info!(path = %db_path.display(), "Mirror store enabled");
    }

    builder.build().await
}

fn report(outcome: MutationOutcome) {
    match outcome {
        MutationOutcome::Applied => println!("ok"),
        MutationOutcome::SessionExpired => {
            warn!("Signing key was not accepted; it will be registered again on the next run");
            println!("session expired, retry the command");
        }
    }
}

async fn run(cli: Cli) -> Result<(), ConnectError> {
    let client = build_client(&cli).await?;

    match cli.command {
        Commands::Connect { target, alias } => report(client.connect(&target, &alias).await?),
        Commands::Disconnect { target } => report(client.disconnect(&target).await?),
        Commands::SetAlias { target, alias } => report(client.set_alias(&target, &alias).await?),
        Commands::Followings => {
            client.authenticate().await?;
            let links = client.mirrored_followings().await?;
            let json = serde_json::to_string_pretty(&links)
                .map_err(|e| ConnectError::Serialization(e.to_string()))?;
            println!("{json}");
        }
        Commands::ResetDevice => {
            client.reset_device().await?;
            println!("device signing key removed");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Exits with status 2 on usage errors
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("{e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), error = %e, "graph-client failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Commands, clap::Error> {
        Cli::try_parse_from(std::iter::once("graph-client").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_connect_with_optional_alias() {
        assert_eq!(
            parse(&["connect", "0xdef"]).unwrap(),
            Commands::Connect {
                target: "0xdef".into(),
                alias: "".into()
            }
        );
        assert_eq!(
            parse(&["connect", "0xdef", "friend"]).unwrap(),
            Commands::Connect {
                target: "0xdef".into(),
                alias: "friend".into()
            }
        );
    }

    #[test]
    fn set_alias_requires_alias() {
        let err = parse(&["set-alias", "0xdef"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);

        assert_eq!(
            parse(&["set-alias", "0xdef", "friend"]).unwrap(),
            Commands::SetAlias {
                target: "0xdef".into(),
                alias: "friend".into()
            }
        );
    }

    #[test]
    fn unknown_or_missing_command_is_usage_error() {
        let err = parse(&["follow", "0xdef"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        assert_eq!(err.exit_code(), 2);

        assert_eq!(parse(&[]).unwrap_err().exit_code(), 2);
        assert_eq!(parse(&["followings"]).unwrap(), Commands::Followings);
    }

    #[test]
    fn global_paths_are_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "graph-client",
            "reset-device",
            "--wallet-key",
            "/tmp/wallet.pem",
            "--key-store-dir",
            "/tmp/keys",
            "--mirror-db",
            "/tmp/mirror.redb",
        ])
        .unwrap();

        assert_eq!(cli.command, Commands::ResetDevice);
        assert_eq!(cli.wallet_key, Some(PathBuf::from("/tmp/wallet.pem")));
        assert_eq!(cli.key_store_dir, PathBuf::from("/tmp/keys"));
        assert_eq!(cli.mirror_db, Some(PathBuf::from("/tmp/mirror.redb")));
    }
}
