//! Error types for zap operations.
//!
//! Every component returns [`ZapError`]. The orchestrator wraps failures in
//! [`ZapError::Stage`] to record which stage failed; [`ZapError::root`] gives
//! back the original error unchanged.

use std::fmt;

/// Stable numeric error codes, useful for CLI exit codes and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ZapErrorCode {
    /// Secure random source unavailable
    Entropy = 1000,
    /// Signing key absent, malformed, or not matching the sender
    Signing = 1001,
    /// Connection or transport failure talking to the invoice service
    Transport = 2000,
    /// Network operation exceeded its timeout
    Timeout = 2001,
    /// Relay connection could not be established
    Connect = 2002,
    /// Invoice service answered with an error or an unusable body
    Service = 3000,
    /// Relay refused a published event
    PublishRejected = 3001,
    /// Required tag absent from an event
    MissingTag = 4000,
    /// Invalid caller input or inconsistent artifacts
    MalformedInput = 4001,
    /// JSON encoding or decoding failed
    Serialization = 4002,
    /// Invalid or incomplete configuration
    Config = 5000,
    /// Attempt cancelled between stages
    Cancelled = 6000,
}

/// Stage of a zap attempt, attached to errors surfaced by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Commitment pair generation.
    Preimage,
    /// Zap request construction and signing.
    Request,
    /// Invoice creation on the payment node.
    Invoice,
    /// Zap receipt construction and signing.
    Receipt,
    /// Publication to the relay.
    Publish,
}

impl Stage {
    /// Lowercase stage name as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preimage => "preimage",
            Self::Request => "request",
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for zap operations.
#[derive(Debug, thiserror::Error)]
pub enum ZapError {
    /// The operating system random source failed.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// Signing failed or the key is unusable.
    #[error("signing error: {0}")]
    Signing(String),

    /// Connection-level failure reaching the invoice service. Retryable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The invoice service returned a non-success status or a malformed body.
    #[error("{}", service_message(.status, .reason))]
    Service {
        /// HTTP status, if the failure came with one
        status: Option<u16>,
        /// Failure description
        reason: String,
    },

    /// A network operation did not complete in time.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// The relay could not be reached.
    #[error("connection to relay {relay} failed: {reason}")]
    Connect {
        /// Relay URI
        relay: String,
        /// Underlying error message
        reason: String,
    },

    /// The relay answered `OK false` for an event, or dropped it.
    #[error("relay {relay} rejected event {event_id}: {reason}")]
    PublishRejected {
        /// Relay URI
        relay: String,
        /// Rejected event id
        event_id: String,
        /// Reason given by the relay
        reason: String,
    },

    /// A required tag was not present.
    #[error("event is missing required '{0}' tag")]
    MissingTag(String),

    /// Invalid input or inconsistent artifacts.
    #[error("invalid {field}: {reason}")]
    MalformedInput {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration missing or unparsable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The attempt was cancelled before it could complete.
    #[error("zap attempt cancelled")]
    Cancelled,

    /// Failure of a specific orchestrator stage.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// Stage that failed
        stage: Stage,
        /// Original error
        #[source]
        source: Box<ZapError>,
    },
}

impl ZapError {
    /// Get the error code of the underlying failure.
    pub fn code(&self) -> ZapErrorCode {
        match self {
            Self::Entropy(_) => ZapErrorCode::Entropy,
            Self::Signing(_) => ZapErrorCode::Signing,
            Self::Transport(_) => ZapErrorCode::Transport,
            Self::Service { .. } => ZapErrorCode::Service,
            Self::Timeout { .. } => ZapErrorCode::Timeout,
            Self::Connect { .. } => ZapErrorCode::Connect,
            Self::PublishRejected { .. } => ZapErrorCode::PublishRejected,
            Self::MissingTag(_) => ZapErrorCode::MissingTag,
            Self::MalformedInput { .. } => ZapErrorCode::MalformedInput,
            Self::Serialization(_) => ZapErrorCode::Serialization,
            Self::Config(_) => ZapErrorCode::Config,
            Self::Cancelled => ZapErrorCode::Cancelled,
            Self::Stage { source, .. } => source.code(),
        }
    }

    /// The original error, with any stage wrappers removed.
    pub fn root(&self) -> &ZapError {
        let mut err = self;
        while let Self::Stage { source, .. } = err {
            err = source;
        }
        err
    }

    /// The stage that failed, if the error came out of the orchestrator.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Attach the failing stage. An error that already carries a stage keeps it.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns true if restarting the attempt (with a fresh commitment pair)
    /// may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), Self::Transport(_) | Self::Timeout { .. })
    }

    /// Suggested delay before a retry, in milliseconds.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self.root() {
            Self::Transport(_) => Some(1000),
            Self::Timeout { .. } => Some(2000),
            _ => None,
        }
    }

    /// Create a malformed input error.
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invoice service error.
    pub fn service(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Service {
            status,
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

fn service_message(status: &Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => format!("invoice service error ({}): {}", code, reason),
        None => format!("invoice service error: {}", reason),
    }
}

impl From<serde_json::Error> for ZapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Attach a stage to the error side of a result.
pub trait StageExt<T> {
    /// Wrap an error with the stage it occurred in.
    fn stage(self, stage: Stage) -> std::result::Result<T, ZapError>;
}

impl<T> StageExt<T> for std::result::Result<T, ZapError> {
    fn stage(self, stage: Stage) -> std::result::Result<T, ZapError> {
        self.map_err(|e| e.in_stage(stage))
    }
}
