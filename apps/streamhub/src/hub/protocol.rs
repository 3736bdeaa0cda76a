//! Hello wire format and first-frame classification.
//!
//! Every connection must open with exactly one hello frame declaring its
//! role. Classification happens in a single parsing step that yields a
//! closed variant, so "unknown client type" is an exhaustively-matched
//! branch rather than a stringly-typed fallthrough.

use serde::Deserialize;
use serde_json::Value;

/// Raw shape of a hello frame. Everything is optional at this stage so
/// classification can produce a precise rejection reason; `type` is kept
/// as a raw value so a present-but-non-string type still classifies as
/// an unknown client rather than a decode failure.
#[derive(Debug, Deserialize)]
struct RawHello {
    #[serde(rename = "type", default)]
    kind: Value,
    account_number: Option<i64>,
}

/// A classified hello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hello {
    /// The sole producer of updates for one account.
    Streamer { account_number: i64 },
    /// A passive recipient of all streamer frames.
    Viewer,
}

/// Why a first frame was rejected. The reason text is sent verbatim in
/// the close frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloError {
    InvalidJson,
    AccountRequired,
    UnknownClientType,
}

impl HelloError {
    pub fn reason(self) -> &'static str {
        match self {
            HelloError::InvalidJson => "Invalid JSON format",
            HelloError::AccountRequired => "Account number is required for streamers",
            HelloError::UnknownClientType => "Unknown client type",
        }
    }
}

/// Classify the first frame of a connection.
pub fn parse_hello(text: &str) -> Result<Hello, HelloError> {
    let raw: RawHello = serde_json::from_str(text).map_err(|_| HelloError::InvalidJson)?;
    match raw.kind.as_str() {
        Some("streamer_hello") => match raw.account_number {
            Some(account_number) => Ok(Hello::Streamer { account_number }),
            None => Err(HelloError::AccountRequired),
        },
        Some("viewer_hello") => Ok(Hello::Viewer),
        _ => Err(HelloError::UnknownClientType),
    }
}
