//! Evaluation response model and wire-record parsing.
//!
//! The remote host answers every submitted script with one structured text
//! record (JSON) carrying a `status`, a printed `value`, and an optional raw
//! `stacktrace`. A record that does not parse is a protocol violation and is
//! fatal to the call that received it — it is never silently recovered.

use serde::Deserialize;

use crate::{AppError, Result};

/// Fixed message carried by a response synthesized after stream closure.
pub const TRANSPORT_CLOSED_MESSAGE: &str = "lost connection to the remote host";

/// Outcome classification for one remote evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalStatus {
    /// The script evaluated without throwing; `value` is its printed result.
    Success,
    /// The script threw; `value` describes the exception.
    Exception,
    /// The transport failed before a response arrived. Synthesized locally;
    /// the remote host never sends this status.
    Error,
}

/// Decoded result of one evaluation round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResponse {
    /// Outcome classification.
    pub status: EvalStatus,
    /// Printed representation of the result or failure.
    pub value: String,
    /// Raw engine stack trace, present on exceptions that captured one.
    pub stacktrace: Option<String>,
}

/// Structured record as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireRecord {
    status: EvalStatus,
    value: String,
    #[serde(default)]
    stacktrace: Option<String>,
}

impl EvalResponse {
    /// Parse a complete response message into an `EvalResponse`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] when the payload is not the expected
    /// structured record. Per the session error contract this is fatal to
    /// the call, not recovered.
    pub fn parse(raw: &str) -> Result<Self> {
        let record: WireRecord = serde_json::from_str(raw)
            .map_err(|err| AppError::Protocol(format!("malformed response payload: {err}")))?;

        Ok(Self {
            status: record.status,
            value: record.value,
            stacktrace: record.stacktrace,
        })
    }

    /// Response synthesized when the stream closed with a call outstanding.
    #[must_use]
    pub fn transport_closed() -> Self {
        Self {
            status: EvalStatus::Error,
            value: TRANSPORT_CLOSED_MESSAGE.to_owned(),
            stacktrace: None,
        }
    }

    /// Whether the remote evaluation completed without throwing.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == EvalStatus::Success
    }
}
