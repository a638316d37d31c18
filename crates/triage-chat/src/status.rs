use serde::Serialize;
use std::fmt;

/// Why an exchange failed. The `Display` text is meant for end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    #[error("Rate limit exceeded. Please wait a moment before trying again.")]
    RateLimited,

    #[error("AI service credits exhausted. Please contact support.")]
    QuotaExhausted,

    /// Non-2xx status other than 429/402, a missing body, or a request that
    /// could not be sent.
    #[error("Failed to connect to AI service")]
    ConnectionFailed,

    #[error("Request cancelled")]
    Cancelled,

    /// The body failed mid-stream.
    #[error("Connection lost while receiving the response")]
    TransportError,
}

/// Lifecycle of the current (or last) exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ExchangeStatus {
    #[default]
    Idle,
    Sending,
    Streaming,
    Finalized,
    Failed(FailureReason),
}

impl ExchangeStatus {
    /// An exchange is running; new submissions are rejected.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Sending | Self::Streaming)
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sending => write!(f, "sending"),
            Self::Streaming => write!(f, "streaming"),
            Self::Finalized => write!(f, "finalized"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// HTTP status of the endpoint's response, reduced to what the client acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx: read the event stream.
    Stream,
    /// 429
    RateLimited,
    /// 402
    QuotaExhausted,
    /// Any other status.
    Rejected(u16),
}

impl ResponseClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            402 => Self::QuotaExhausted,
            200..=299 => Self::Stream,
            other => Self::Rejected(other),
        }
    }

    /// The failure this class maps to, or `None` when the stream may be read.
    pub fn failure(self) -> Option<FailureReason> {
        match self {
            Self::Stream => None,
            Self::RateLimited => Some(FailureReason::RateLimited),
            Self::QuotaExhausted => Some(FailureReason::QuotaExhausted),
            Self::Rejected(_) => Some(FailureReason::ConnectionFailed),
        }
    }
}

/// Result of one `ChatSession::submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The reply was streamed into the log. `incomplete` is set when the
    /// stream closed with undecodable data that had to be dropped.
    Finalized { incomplete: bool },
    /// The log was rolled back to its pre-submit contents.
    Failed(FailureReason),
    /// Empty input, or another exchange was already in flight.
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_classes() {
        assert_eq!(ResponseClass::from_status(200), ResponseClass::Stream);
        assert_eq!(ResponseClass::from_status(204), ResponseClass::Stream);
        assert_eq!(ResponseClass::from_status(429), ResponseClass::RateLimited);
        assert_eq!(ResponseClass::from_status(402), ResponseClass::QuotaExhausted);
        assert_eq!(ResponseClass::from_status(500), ResponseClass::Rejected(500));
        assert_eq!(ResponseClass::from_status(301), ResponseClass::Rejected(301));
    }

    #[test]
    fn classes_map_to_failures() {
        assert_eq!(ResponseClass::Stream.failure(), None);
        assert_eq!(
            ResponseClass::from_status(429).failure(),
            Some(FailureReason::RateLimited)
        );
        assert_eq!(
            ResponseClass::from_status(402).failure(),
            Some(FailureReason::QuotaExhausted)
        );
        assert_eq!(
            ResponseClass::from_status(401).failure(),
            Some(FailureReason::ConnectionFailed)
        );
    }

    #[test]
    fn failure_messages_are_user_facing() {
        assert_eq!(
            FailureReason::RateLimited.to_string(),
            "Rate limit exceeded. Please wait a moment before trying again."
        );
        assert_eq!(
            FailureReason::QuotaExhausted.to_string(),
            "AI service credits exhausted. Please contact support."
        );
        assert_eq!(
            FailureReason::ConnectionFailed.to_string(),
            "Failed to connect to AI service"
        );
    }

    #[test]
    fn in_flight_states() {
        assert!(ExchangeStatus::Sending.is_in_flight());
        assert!(ExchangeStatus::Streaming.is_in_flight());
        assert!(!ExchangeStatus::Idle.is_in_flight());
        assert!(!ExchangeStatus::Finalized.is_in_flight());
        assert!(!ExchangeStatus::Failed(FailureReason::Cancelled).is_in_flight());
    }

    #[test]
    fn status_serializes_with_reason() {
        let json = serde_json::to_string(&ExchangeStatus::Failed(FailureReason::RateLimited)).unwrap();
        assert_eq!(json, r#"{"state":"failed","reason":"rate_limited"}"#);
        let json = serde_json::to_string(&ExchangeStatus::Streaming).unwrap();
        assert_eq!(json, r#"{"state":"streaming"}"#);
    }
}
