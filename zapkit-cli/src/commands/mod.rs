//! CLI command implementations

pub mod verify;
pub mod zap;

use anyhow::{bail, Result};
use zapkit_lib::{LndConfig, ZapConfig, ZapError, ZapErrorCode, ZapTarget};

/// Connection settings given on the command line.
///
/// Each value set here replaces the one loaded from the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub lnd_url: Option<String>,
    pub lnd_macaroon: Option<String>,
    pub lnd_timeout_secs: Option<u64>,
    pub relays: Vec<String>,
    pub relay_timeout_secs: Option<u64>,
}

impl Overrides {
    /// Layer these settings over `config`.
    pub fn apply(&self, mut config: ZapConfig) -> Result<ZapConfig> {
        match (config.lnd.as_mut(), &self.lnd_url, &self.lnd_macaroon) {
            (Some(lnd), url, macaroon) => {
                if let Some(url) = url {
                    lnd.rest_url = url.clone();
                }
                if let Some(macaroon) = macaroon {
                    lnd.macaroon_hex = macaroon.clone();
                }
            }
            (None, Some(url), Some(macaroon)) => {
                config.lnd = Some(LndConfig::new(url.clone(), macaroon.clone()));
            }
            (None, Some(_), None) => bail!("--lnd-url needs --lnd-macaroon or ZAPKIT_LND_MACAROON"),
            (None, None, Some(_)) => bail!("--lnd-macaroon needs --lnd-url or ZAPKIT_LND_URL"),
            (None, None, None) => {}
        }

        if let (Some(lnd), Some(secs)) = (config.lnd.as_mut(), self.lnd_timeout_secs) {
            lnd.timeout_secs = secs;
        }
        if !self.relays.is_empty() {
            config.relay.relays = self.relays.clone();
        }
        if let Some(secs) = self.relay_timeout_secs {
            config.relay.timeout_secs = secs;
        }
        Ok(config)
    }
}

/// Load `ZAPKIT_*` configuration and apply command-line overrides.
pub fn load_config(overrides: &Overrides) -> Result<ZapConfig> {
    overrides.apply(ZapConfig::from_env()?)
}

/// Zap target from the mutually exclusive `--event` and `--address` flags.
pub fn target_from_flags(event: Option<String>, address: Option<String>) -> ZapTarget {
    match (event, address) {
        (Some(id), _) => ZapTarget::Event(id),
        (None, Some(coordinate)) => ZapTarget::Address(coordinate),
        (None, None) => ZapTarget::Profile,
    }
}

/// Process exit status for a failed command.
///
/// Zap errors map to one status per error family; anything else exits with 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let Some(zap_err) = err.downcast_ref::<ZapError>() else {
        return 1;
    };
    match zap_err.code() {
        ZapErrorCode::Entropy | ZapErrorCode::Signing => 2,
        ZapErrorCode::Transport | ZapErrorCode::Timeout | ZapErrorCode::Connect => 3,
        ZapErrorCode::Service | ZapErrorCode::PublishRejected => 4,
        ZapErrorCode::MissingTag
        | ZapErrorCode::MalformedInput
        | ZapErrorCode::Serialization => 5,
        ZapErrorCode::Config => 6,
        ZapErrorCode::Cancelled => 130,
    }
}
