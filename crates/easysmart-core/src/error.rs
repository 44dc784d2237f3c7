// ── Core error types ──
//
// Errors from easysmart-core. Callers never see raw socket or codec
// failures: the `From<easysmart_api::Error>` impl folds them into the
// variants below.

use easysmart_api::OpCode;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// No usable reply from the switch. Retrying the whole run may help.
    /// `timed_out` marks the case where nothing arrived before the deadline.
    #[error("Cannot reach switch: {reason}")]
    ConnectionFailed { reason: String, timed_out: bool },

    // ── Device errors ────────────────────────────────────────────────
    /// The switch answered with a non-zero error code.
    #[error("Switch rejected {operation} (error_code={error_code})")]
    DeviceRejected { operation: String, error_code: u32 },

    /// The switch answered, but with a reply of the wrong kind.
    #[error(
        "Switch answered {operation} with op code {} instead of {}",
        received.as_u8(),
        expected.as_u8()
    )]
    UnexpectedReply {
        operation: String,
        expected: OpCode,
        received: OpCode,
    },

    /// A mutation failed after earlier phases had already been written.
    #[error("{source} (already applied: {applied})")]
    PartiallyApplied {
        applied: String,
        source: Box<CoreError>,
    },

    // ── Declaration errors ───────────────────────────────────────────
    /// The desired state cannot be applied as written.
    #[error("Invalid declaration: {message}")]
    InvalidDeclaration { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            message: message.into(),
        }
    }

    /// The underlying failure, looking through [`CoreError::PartiallyApplied`].
    pub fn root(&self) -> &CoreError {
        match self {
            Self::PartiallyApplied { source, .. } => source.root(),
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<easysmart_api::Error> for CoreError {
    fn from(err: easysmart_api::Error) -> Self {
        match err {
            easysmart_api::Error::ConnectionProblem { reason, timed_out } => {
                CoreError::ConnectionFailed { reason, timed_out }
            }
            easysmart_api::Error::Io(e) => CoreError::ConnectionFailed {
                reason: format!("socket setup failed: {e}"),
                timed_out: false,
            },
            easysmart_api::Error::InvalidMac(mac) => CoreError::Config {
                message: format!("invalid MAC address '{mac}'"),
            },
            easysmart_api::Error::Encode { property, reason } => {
                CoreError::invalid(format!("cannot encode {property}: {reason}"))
            }
            easysmart_api::Error::Decode(e) => CoreError::Internal(format!("decode error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_problems_stay_connection_failures() {
        let err: CoreError = easysmart_api::Error::ConnectionProblem {
            reason: "no reply".into(),
            timed_out: true,
        }
        .into();
        assert!(matches!(err, CoreError::ConnectionFailed { timed_out: true, .. }));
        assert_eq!(err.to_string(), "Cannot reach switch: no reply");
    }

    #[test]
    fn socket_setup_failures_are_not_timeouts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "SO_BINDTODEVICE");
        let err: CoreError = easysmart_api::Error::Io(io).into();
        assert!(matches!(err, CoreError::ConnectionFailed { timed_out: false, .. }));
    }

    #[test]
    fn unexpected_reply_names_both_op_codes() {
        let err = CoreError::UnexpectedReply {
            operation: "change default credentials".into(),
            expected: OpCode::LoginReply,
            received: OpCode::GetReply,
        };
        assert_eq!(
            err.to_string(),
            "Switch answered change default credentials with op code 2 instead of 4"
        );
    }

    #[test]
    fn encode_failures_point_at_the_declaration() {
        let err: CoreError = easysmart_api::Error::Encode {
            property: "vlan",
            reason: "port 40 outside 1..=32".into(),
        }
        .into();
        assert!(matches!(err, CoreError::InvalidDeclaration { .. }));
    }
}
