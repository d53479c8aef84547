//! Frame types matching the lesson-client WebSocket protocol.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Participant role within a session.
///
/// The role decides translation direction (the teacher speaks the
/// configured source language, students speak the session's student
/// language) and timer-command authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Session owner; controls the shared timer.
    Teacher,
    /// Session participant.
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Teacher => f.write_str("teacher"),
            Self::Student => f.write_str("student"),
        }
    }
}

/// Timer command issued by the teacher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    /// Start, or resume after a pause.
    Start,
    /// Freeze the elapsed value.
    Pause,
    /// Discard the timer entirely.
    Stop,
}

/// Incoming frame from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Bind this connection to a session under a role.
    #[serde(rename = "join", rename_all = "camelCase")]
    Join {
        /// Opaque session identifier shared by both parties.
        session_id: String,
        /// Role to bind as.
        role: Role,
        /// Student language code; only honored on a teacher join.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
    },

    /// Chat message to translate and relay.
    #[serde(rename = "message", alias = "chat")]
    Message {
        /// Message text in the sender's language.
        text: String,
    },

    /// Timer command (teacher only).
    #[serde(rename = "timer_command", alias = "timer")]
    TimerCommand {
        /// Which transition to apply.
        action: TimerAction,
    },

    /// Opaque WebRTC signaling payload to relay to the other party.
    #[serde(rename = "webrtc_signal")]
    WebrtcSignal {
        /// SDP offer/answer or ICE candidate; never inspected.
        signal: Value,
    },
}

/// Outgoing frame to a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Join confirmation echoed to the joining connection.
    #[serde(rename = "joined", rename_all = "camelCase")]
    Joined {
        /// Session the connection is now bound to.
        session_id: String,
        /// Role the connection is bound as.
        role: Role,
    },

    /// Translated chat message, delivered to every session member
    /// including the sender.
    #[serde(rename = "message")]
    Message {
        /// Sender role.
        role: Role,
        /// Text as the sender wrote it.
        original: String,
        /// Translated text, or a tagged fallback when translation failed.
        translated: String,
        /// ISO-8601 delivery timestamp.
        timestamp: String,
    },

    /// Current elapsed seconds of the shared timer.
    #[serde(rename = "timer_update")]
    TimerUpdate {
        /// Elapsed seconds; `0` after a stop.
        seconds: u64,
    },

    /// Relayed signaling payload.
    #[serde(rename = "webrtc_signal")]
    WebrtcSignal {
        /// The payload, byte-for-byte as the sender supplied it.
        signal: Value,
        /// Role of the sending party.
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<Role>,
    },

    /// Error reply, sent only to the offending connection.
    #[serde(rename = "error")]
    Error {
        /// Machine-readable code (e.g. `NOT_AUTHORIZED`).
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl ServerFrame {
    /// Build a chat frame with the current UTC timestamp.
    pub fn message(role: Role, original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self::Message {
            role,
            original: original.into(),
            translated: translated.into(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }

    /// Build an error frame.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a timer update frame.
    pub fn timer_update(seconds: u64) -> Self {
        Self::TimerUpdate { seconds }
    }
}
