//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use easysmart_config::ConfigError;
use easysmart_core::CoreError;

pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const REJECTED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not talk to the switch: {reason}")]
    #[diagnostic(
        code(easysmart::connection_failed),
        help(
            "Check that the host interface is on the switch's network segment\n\
             and that nothing else is bound to UDP port 29809."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("No reply from the switch: {reason}")]
    #[diagnostic(
        code(easysmart::timeout),
        help(
            "Verify the switch MAC (--switch-mac) and interface (--interface),\n\
             or increase the wait with --timeout."
        )
    )]
    Timeout { reason: String },

    // ── Device ───────────────────────────────────────────────────────
    #[error("Login refused by the switch (error_code={error_code})")]
    #[diagnostic(
        code(easysmart::auth_failed),
        help("Check the username and password for profile '{profile}'.\nRun: easysmart config set-password")
    )]
    AuthFailed { profile: String, error_code: u32 },

    #[error("Switch rejected {operation} (error_code={error_code})")]
    #[diagnostic(
        code(easysmart::rejected),
        help("For take-ownership, the switch must be at factory defaults (admin/admin).")
    )]
    Rejected { operation: String, error_code: u32 },

    #[error("Switch answered {operation} with op code {received} instead of {expected}")]
    #[diagnostic(
        code(easysmart::unexpected_reply),
        help("Another switch or tool may be answering on the segment; pass --switch-mac.")
    )]
    UnexpectedReply {
        operation: String,
        expected: u8,
        received: u8,
    },

    #[error("{message}")]
    #[diagnostic(
        code(easysmart::partially_applied),
        help("Earlier changes were written. Re-run once the cause is fixed; apply is idempotent.")
    )]
    PartiallyApplied {
        message: String,
        exit_code: i32,
    },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(easysmart::no_credentials),
        help(
            "Configure credentials with: easysmart config init\n\
             Or set username and password_env in the profile."
        )
    )]
    NoCredentials { profile: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(easysmart::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid declaration: {message}")]
    #[diagnostic(
        code(easysmart::invalid_declaration),
        help("Nothing was written to the switch.")
    )]
    InvalidDeclaration { message: String },

    #[error("No host interface found {what}")]
    #[diagnostic(
        code(easysmart::no_interface),
        help("Pass --interface or --source-address explicitly.")
    )]
    NoInterface { what: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(easysmart::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: easysmart config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(easysmart::config))]
    Config(Box<ConfigError>),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(easysmart::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Rejected { .. } | Self::UnexpectedReply { .. } => exit_code::REJECTED,
            Self::PartiallyApplied { exit_code, .. } => *exit_code,
            Self::Validation { .. }
            | Self::InvalidDeclaration { .. }
            | Self::NoInterface { .. }
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            Self::Config(_) | Self::Internal(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }

    /// Like `From<CoreError>`, naming the profile for login failures.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::DeviceRejected {
                operation,
                error_code,
            } if operation == "login" => Self::AuthFailed {
                profile: profile.into(),
                error_code,
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed {
                reason,
                timed_out: true,
            } => CliError::Timeout { reason },
            CoreError::ConnectionFailed {
                reason,
                timed_out: false,
            } => CliError::ConnectionFailed { reason },

            CoreError::DeviceRejected {
                operation,
                error_code,
            } => CliError::Rejected {
                operation,
                error_code,
            },

            CoreError::UnexpectedReply {
                operation,
                expected,
                received,
            } => CliError::UnexpectedReply {
                operation,
                expected: expected.as_u8(),
                received: received.as_u8(),
            },

            err @ CoreError::PartiallyApplied { .. } => {
                let message = err.to_string();
                let exit_code = match err {
                    CoreError::PartiallyApplied { source, .. } => CliError::from(*source).exit_code(),
                    _ => exit_code::GENERAL,
                };
                CliError::PartiallyApplied { message, exit_code }
            }

            CoreError::InvalidDeclaration { message } => CliError::InvalidDeclaration { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Declaration { path, source } => CliError::InvalidDeclaration {
                message: format!("{}: {source}", path.display()),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
