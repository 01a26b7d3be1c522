use serde::{Deserialize, Serialize};
use ts_rs::TS;

// === Query channel (plain text) ===
//
// Client -> Server: a pendulum id.
// Server -> Client: the angle as a decimal string, or one of the error lines below.

pub const NOT_FOUND_REPLY: &str = "No pendulum found for that ID";
pub const VANISHED_REPLY: &str = "Pendulum vanished unexpectedly";
pub const INVALID_ID_REPLY: &str = "Invalid pendulum id";
pub const UNAVAILABLE_REPLY: &str = "Store unavailable, retry";

/// One reply on the query channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryReply {
    Angle(f64),
    NotFound,
    Vanished,
    InvalidId,
    Unavailable,
}

impl QueryReply {
    pub fn to_text(&self) -> String {
        match self {
            QueryReply::Angle(angle) => angle.to_string(),
            QueryReply::NotFound => NOT_FOUND_REPLY.to_string(),
            QueryReply::Vanished => VANISHED_REPLY.to_string(),
            QueryReply::InvalidId => INVALID_ID_REPLY.to_string(),
            QueryReply::Unavailable => UNAVAILABLE_REPLY.to_string(),
        }
    }

    /// Parse a reply line. Returns None for text that is neither a number nor a known error.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            NOT_FOUND_REPLY => Some(QueryReply::NotFound),
            VANISHED_REPLY => Some(QueryReply::Vanished),
            INVALID_ID_REPLY => Some(QueryReply::InvalidId),
            UNAVAILABLE_REPLY => Some(QueryReply::Unavailable),
            other => other.trim().parse::<f64>().ok().map(QueryReply::Angle),
        }
    }
}

// === REST ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
pub struct ErrorResponse {
    pub error: String,
}

/// Population-wide motion phase as reported by `/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum PhaseWire {
    Running,
    Cooldown,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub phase: PhaseWire,
    /// When the pending resume fires (ms since epoch), only during a cooldown
    #[ts(type = "number | null")]
    pub resume_at: Option<i64>,
    #[ts(type = "number")]
    pub collision_cycles: u64,
    pub pendulums: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_reply_is_plain_decimal() {
        assert_eq!(QueryReply::Angle(0.5).to_text(), "0.5");
        assert_eq!(QueryReply::Angle(0.0).to_text(), "0");
        assert_eq!(
            QueryReply::Angle(std::f64::consts::FRAC_PI_4).to_text(),
            "0.7853981633974483"
        );
    }

    #[test]
    fn error_replies_parse_back() {
        for reply in [
            QueryReply::NotFound,
            QueryReply::Vanished,
            QueryReply::InvalidId,
            QueryReply::Unavailable,
        ] {
            assert_eq!(QueryReply::parse(&reply.to_text()), Some(reply));
        }
    }

    #[test]
    fn angle_parses_from_text() {
        assert_eq!(QueryReply::parse("-0.25"), Some(QueryReply::Angle(-0.25)));
        assert_eq!(QueryReply::parse("not an angle"), None);
    }

    #[test]
    fn status_serializes_camel_case() {
        let status = StatusResponse {
            phase: PhaseWire::Cooldown,
            resume_at: Some(5_000),
            collision_cycles: 1,
            pendulums: 2,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"phase\":\"cooldown\""));
        assert!(json.contains("\"resumeAt\":5000"));
        assert!(json.contains("\"collisionCycles\":1"));
    }
}
