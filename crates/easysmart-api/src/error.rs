use thiserror::Error;

use crate::codec::DecodeError;

/// Top-level error type for the `easysmart-api` crate.
///
/// `Session` collapses every socket, timeout and decode failure during a
/// request/response exchange into [`Error::ConnectionProblem`]; a corrupt
/// reply is operationally the same as no reply. The other variants only
/// surface from codec helpers and transport setup.
#[derive(Debug, Error)]
pub enum Error {
    // ── Exchange ────────────────────────────────────────────────────
    /// The switch did not answer, answered garbage, or the socket failed.
    /// `timed_out` is set when the receive deadline passed with no reply.
    #[error("Connection problem: {reason}")]
    ConnectionProblem { reason: String, timed_out: bool },

    // ── Codec ───────────────────────────────────────────────────────
    /// Malformed or truncated frame bytes.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A property value does not fit its wire encoding.
    #[error("Cannot encode property {property}: {reason}")]
    Encode {
        property: &'static str,
        reason: String,
    },

    // ── Setup ───────────────────────────────────────────────────────
    /// Socket creation or binding failed.
    #[error("Socket setup failed: {0}")]
    Io(#[from] std::io::Error),

    /// Could not parse a MAC address.
    #[error("Invalid MAC address '{0}'")]
    InvalidMac(String),
}

impl Error {
    pub(crate) fn connection(reason: impl Into<String>) -> Self {
        Self::ConnectionProblem {
            reason: reason.into(),
            timed_out: false,
        }
    }

    pub(crate) fn timeout(reason: impl Into<String>) -> Self {
        Self::ConnectionProblem {
            reason: reason.into(),
            timed_out: true,
        }
    }

    /// Returns `true` if the switch never answered within the wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionProblem { timed_out: true, .. })
    }

    /// Returns `true` if retrying the whole operation might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionProblem { .. })
    }
}
