//! Client error types

use std::time::Duration;

use keeper_common::error::{ErrorClassification, ErrorSeverity};
use keeper_common::resilience::repeater::RepeaterError;
use thiserror::Error;

/// Failure of a single request to the keeper server
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS or transport-level failure
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("server answered {status} for {url}")]
    Status { status: u16, url: String },

    /// The body could not be decoded
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request was abandoned because its context ended
    #[error("request cancelled")]
    Cancelled,

    /// The HTTP client could not be constructed
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ClientError {
    /// Statuses worth retrying: server errors, throttling and request timeout.
    pub fn is_retryable_status(status: u16) -> bool {
        status >= 500 || status == 429 || status == 408
    }

    /// HTTP status carried by `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl ErrorClassification for ClientError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => Self::is_retryable_status(*status),
            Self::Decode { .. } | Self::Cancelled | Self::Build(_) => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network { .. } => ErrorSeverity::Warning,
            Self::Status { status, .. } if Self::is_retryable_status(*status) => {
                ErrorSeverity::Warning
            }
            Self::Status { .. } | Self::Decode { .. } => ErrorSeverity::Error,
            Self::Cancelled => ErrorSeverity::Info,
            Self::Build(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Build(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Failure of the startup handshake
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The retry run ended with an error
    #[error("handshake with {address} failed: {source}")]
    Handshake {
        address: String,
        #[source]
        source: RepeaterError<ClientError>,
    },

    /// The retry task stopped without publishing a completion
    #[error("handshake task ended without a result")]
    Aborted,
}

impl BootstrapError {
    /// True when the handshake ended because the user asked to stop.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Handshake { source, .. } => {
                source.is_cancelled() || matches!(source.operation_error(), Some(ClientError::Cancelled))
            }
            Self::Aborted => false,
        }
    }
}
