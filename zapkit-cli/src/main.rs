//! Zapkit CLI
//!
//! Creates Nostr zaps against an LND node and checks zap receipts.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use zapkit_cli::commands::{self, zap::ZapOptions, Overrides};
use zapkit_cli::ui;

#[derive(Parser, Debug)]
#[command(name = "zapkit")]
#[command(about = "Create, publish and verify Nostr zaps", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Zap a profile, event or address
    Zap {
        /// Recipient public key (hex)
        recipient: String,

        /// Amount in millisatoshis
        #[arg(short, long)]
        amount: u64,

        /// Zap this event id instead of the profile
        #[arg(long, conflicts_with = "address")]
        event: Option<String>,

        /// Zap this `<kind>:<pubkey>:<d>` coordinate instead of the profile
        #[arg(long)]
        address: Option<String>,

        /// Comment attached to the zap
        #[arg(short, long, default_value = "")]
        content: String,

        /// Recipient lnurl
        #[arg(long)]
        lnurl: Option<String>,

        /// Retries after a transient invoice failure
        #[arg(long, default_value_t = 0)]
        retries: u32,

        /// Build and sign the request only; contact nothing
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Check a zap receipt and the request it embeds
    Verify {
        /// Receipt event JSON file, or `-` for stdin
        receipt: PathBuf,

        /// Require the receipt to be signed by this public key (hex)
        #[arg(long)]
        signer: Option<String>,
    },
}

/// Overrides for `ZAPKIT_*` environment settings.
#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Relay URI; repeat for several (overrides ZAPKIT_RELAYS)
    #[arg(short, long = "relay")]
    relays: Vec<String>,

    /// Relay timeout in seconds (overrides ZAPKIT_RELAY_TIMEOUT)
    #[arg(long)]
    relay_timeout: Option<u64>,

    /// LND REST URL (overrides ZAPKIT_LND_URL)
    #[arg(long)]
    lnd_url: Option<String>,

    /// LND invoice macaroon, hex (overrides ZAPKIT_LND_MACAROON)
    #[arg(long)]
    lnd_macaroon: Option<String>,

    /// LND request timeout in seconds (overrides ZAPKIT_LND_TIMEOUT)
    #[arg(long)]
    lnd_timeout: Option<u64>,
}

impl From<ConnectionArgs> for Overrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            lnd_url: args.lnd_url,
            lnd_macaroon: args.lnd_macaroon,
            lnd_timeout_secs: args.lnd_timeout,
            relays: args.relays,
            relay_timeout_secs: args.relay_timeout,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_filter = if cli.verbose {
        "zapkit=debug,zapkit_cli=debug,zapkit_lib=debug"
    } else {
        "zapkit_cli=info,zapkit_lib=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = dispatch(cli).await {
        ui::error(&err.to_string());
        std::process::exit(commands::exit_code(&err));
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Zap {
            recipient,
            amount,
            event,
            address,
            content,
            lnurl,
            retries,
            dry_run,
            connection,
        } => {
            let config = commands::load_config(&connection.into())?;
            tracing::debug!(?config, "loaded configuration");
            let options = ZapOptions {
                recipient,
                amount_msat: amount,
                target: commands::target_from_flags(event, address),
                content,
                lnurl,
                retries,
                dry_run,
            };
            commands::zap::run(&config, &options).await?;
        }
        Commands::Verify { receipt, signer } => {
            commands::verify::run(&receipt, signer.as_deref())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_zap() {
        let cli = Cli::try_parse_from([
            "zapkit", "zap", "abcd", "--amount", "21000", "--event", "ef01", "-r", "wss://a",
            "-r", "wss://b", "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Zap {
                amount,
                event,
                dry_run,
                connection,
                ..
            } => {
                assert_eq!(amount, 21000);
                assert_eq!(event.as_deref(), Some("ef01"));
                assert!(dry_run);
                assert_eq!(connection.relays, vec!["wss://a", "wss://b"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_event_and_address_conflict() {
        let result = Cli::try_parse_from([
            "zapkit", "zap", "abcd", "--amount", "1", "--event", "ef", "--address", "1:ab:d",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_amount_required() {
        assert!(Cli::try_parse_from(["zapkit", "zap", "abcd"]).is_err());
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from(["zapkit", "-v", "verify", "receipt.json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Verify { ref signer, .. } if signer.is_none()));
    }
}
