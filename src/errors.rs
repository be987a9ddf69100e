//! Error types shared across the application.

use std::fmt::{Display, Formatter};

use crate::bootstrap::BootstrapStep;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Transport failure — the stream closed or the connect/write failed.
    Transport(String),
    /// Wire protocol violation — a response payload that cannot be framed
    /// or parsed. Fatal to the call that observed it.
    Protocol(String),
    /// The remote engine reported a failed evaluation where success was
    /// required (e.g. during session setup).
    Eval(String),
    /// Session bootstrap aborted at a specific handshake step.
    Bootstrap {
        /// The step that failed; later steps never ran.
        step: BootstrapStep,
        /// Underlying failure.
        cause: Box<AppError>,
    },
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Eval(msg) => write!(f, "eval: {msg}"),
            Self::Bootstrap { step, cause } => write!(
                f,
                "bootstrap step {} ({}) failed: {cause}",
                step.index(),
                step.label()
            ),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
