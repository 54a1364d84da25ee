//! Configuration for the invoice service and relay connections.
//!
//! Values can be built in code, deserialized, or loaded from the
//! environment:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `ZAPKIT_LND_URL` | LND REST endpoint, e.g. `https://localhost:8080` |
//! | `ZAPKIT_LND_MACAROON` | Invoice macaroon, hex |
//! | `ZAPKIT_LND_TLS_CERT` | PEM certificate for a self-signed node (optional) |
//! | `ZAPKIT_LND_TIMEOUT` | Invoice request timeout, seconds |
//! | `ZAPKIT_LND_ACCEPT_INVALID_CERTS` | `true` to skip certificate checks |
//! | `ZAPKIT_PRIVKEY` | Signing key, hex |
//! | `ZAPKIT_RELAYS` | Comma separated relay URIs |
//! | `ZAPKIT_RELAY_TIMEOUT` | Relay connect and acknowledgement timeout, seconds |

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, ZapError};

fn default_lnd_timeout() -> u64 {
    30
}

fn default_relay_timeout() -> u64 {
    10
}

/// Configuration for the LND REST invoice endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct LndConfig {
    /// REST API endpoint URL (e.g., "https://localhost:8080").
    pub rest_url: String,

    /// Macaroon for authentication (hex-encoded).
    pub macaroon_hex: String,

    /// TLS certificate (PEM format, optional for self-signed).
    #[serde(default)]
    pub tls_cert_pem: Option<String>,

    /// Skip certificate verification. Only for local regtest nodes.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_lnd_timeout")]
    pub timeout_secs: u64,
}

impl LndConfig {
    /// Create a new LND configuration.
    pub fn new(rest_url: impl Into<String>, macaroon_hex: impl Into<String>) -> Self {
        Self {
            rest_url: rest_url.into(),
            macaroon_hex: macaroon_hex.into(),
            tls_cert_pem: None,
            accept_invalid_certs: false,
            timeout_secs: default_lnd_timeout(),
        }
    }

    /// Set the TLS certificate.
    pub fn with_tls_cert(mut self, cert_pem: impl Into<String>) -> Self {
        self.tls_cert_pem = Some(cert_pem.into());
        self
    }

    /// Accept self-signed or otherwise invalid certificates.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the endpoint and macaroon are usable.
    pub fn validate(&self) -> Result<()> {
        if self.rest_url.is_empty() {
            return Err(ZapError::Config("LND REST URL cannot be empty".to_string()));
        }
        if !self.rest_url.starts_with("http://") && !self.rest_url.starts_with("https://") {
            return Err(ZapError::Config(format!(
                "LND REST URL '{}' must start with http:// or https://",
                self.rest_url
            )));
        }
        if self.macaroon_hex.is_empty() {
            return Err(ZapError::Config("LND macaroon cannot be empty".to_string()));
        }
        if hex::decode(&self.macaroon_hex).is_err() {
            return Err(ZapError::Config("LND macaroon must be hex".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ZapError::Config("LND timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for LndConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LndConfig")
            .field("rest_url", &self.rest_url)
            .field("macaroon_hex", &"<redacted>")
            .field("tls_cert_pem", &self.tls_cert_pem.as_ref().map(|_| "<pem>"))
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Relay list and timeouts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relay URIs, in preference order. The first one receives the events.
    #[serde(default)]
    pub relays: Vec<String>,

    /// Connect and acknowledgement timeout in seconds.
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relays: Vec::new(),
            timeout_secs: default_relay_timeout(),
        }
    }
}

impl RelayConfig {
    /// Create a relay configuration with the default timeout.
    pub fn new(relays: Vec<String>) -> Self {
        Self {
            relays,
            ..Self::default()
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything a zap run needs from the outside world.
#[derive(Clone, Default)]
pub struct ZapConfig {
    /// Invoice endpoint, if configured.
    pub lnd: Option<LndConfig>,
    /// Relays.
    pub relay: RelayConfig,
    /// Hex secret key used to sign both events.
    pub private_key_hex: Option<String>,
}

impl ZapConfig {
    /// Load configuration from `ZAPKIT_*` environment variables.
    ///
    /// Unset variables leave the corresponding value empty; malformed
    /// numbers and booleans are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let lnd = match (get("ZAPKIT_LND_URL"), get("ZAPKIT_LND_MACAROON")) {
            (Some(url), Some(macaroon)) => {
                let mut config = LndConfig::new(url.trim(), macaroon.trim());
                if let Some(cert) = get("ZAPKIT_LND_TLS_CERT") {
                    config = config.with_tls_cert(cert);
                }
                if let Some(timeout) = get("ZAPKIT_LND_TIMEOUT") {
                    config = config.with_timeout(parse_secs("ZAPKIT_LND_TIMEOUT", &timeout)?);
                }
                if let Some(accept) = get("ZAPKIT_LND_ACCEPT_INVALID_CERTS") {
                    config = config.with_accept_invalid_certs(parse_bool(
                        "ZAPKIT_LND_ACCEPT_INVALID_CERTS",
                        &accept,
                    )?);
                }
                Some(config)
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(ZapError::Config(
                    "ZAPKIT_LND_URL is set but ZAPKIT_LND_MACAROON is not".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(ZapError::Config(
                    "ZAPKIT_LND_MACAROON is set but ZAPKIT_LND_URL is not".to_string(),
                ))
            }
        };

        let mut relay = RelayConfig::default();
        if let Some(relays) = get("ZAPKIT_RELAYS") {
            relay.relays = relays
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(timeout) = get("ZAPKIT_RELAY_TIMEOUT") {
            relay.timeout_secs = parse_secs("ZAPKIT_RELAY_TIMEOUT", &timeout)?;
        }

        Ok(Self {
            lnd,
            relay,
            private_key_hex: get("ZAPKIT_PRIVKEY").map(|k| k.trim().to_string()),
        })
    }

    /// The LND configuration, or a configuration error naming what is missing.
    pub fn require_lnd(&self) -> Result<&LndConfig> {
        self.lnd.as_ref().ok_or_else(|| {
            ZapError::Config("set ZAPKIT_LND_URL and ZAPKIT_LND_MACAROON".to_string())
        })
    }

    /// The signing key, or a configuration error.
    pub fn require_private_key(&self) -> Result<&str> {
        self.private_key_hex
            .as_deref()
            .ok_or_else(|| ZapError::Config("set ZAPKIT_PRIVKEY".to_string()))
    }
}

impl fmt::Debug for ZapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZapConfig")
            .field("lnd", &self.lnd)
            .field("relay", &self.relay)
            .field(
                "private_key_hex",
                &self.private_key_hex.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ZapError::Config(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, value
        ))),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ZapError::Config(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}
