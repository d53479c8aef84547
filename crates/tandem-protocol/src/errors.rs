//! Relay error codes and error type.

use crate::frames::ServerFrame;

// ── Error code constants ────────────────────────────────────────────

/// Frame was not valid JSON or had an unknown `type`.
pub const INVALID_FRAME: &str = "INVALID_FRAME";
/// Connection sent a session-scoped frame before joining.
pub const NOT_JOINED: &str = "NOT_JOINED";
/// Timer command from a connection not bound as teacher.
pub const NOT_AUTHORIZED: &str = "NOT_AUTHORIZED";
/// Join frame carried an empty session identifier.
pub const SESSION_REQUIRED: &str = "SESSION_REQUIRED";

/// Error produced while handling a client frame.
///
/// Every variant maps to an `error` frame sent back to the offending
/// connection only; none of them terminate the connection.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Frame could not be parsed.
    #[error("invalid frame: {message}")]
    InvalidFrame {
        /// What was wrong with it.
        message: String,
    },

    /// Session-scoped frame from an unbound connection.
    #[error("join a session before sending this frame")]
    NotJoined,

    /// Timer command from a non-teacher connection.
    #[error("only the teacher may control the timer")]
    NotAuthorized,

    /// Join without a usable session identifier.
    #[error("sessionId must not be empty")]
    SessionRequired,
}

impl RelayError {
    /// Machine-readable code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFrame { .. } => INVALID_FRAME,
            Self::NotJoined => NOT_JOINED,
            Self::NotAuthorized => NOT_AUTHORIZED,
            Self::SessionRequired => SESSION_REQUIRED,
        }
    }

    /// Convert into the wire-format error frame.
    pub fn to_frame(&self) -> ServerFrame {
        ServerFrame::error(self.code(), self.to_string())
    }
}
