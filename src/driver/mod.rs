//! Host-integration driver abstraction.
//!
//! The [`ReplDriver`] trait is the surface an embedding REPL or editor
//! tooling host programs against: session setup, evaluation, module
//! loading, teardown, and stack-trace handling. One concrete session type
//! ([`UplinkDriver`]) implements it; no wider hierarchy exists or is
//! needed.

pub mod uplink;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::models::eval::EvalResponse;
use crate::models::frame::StackFrame;
use crate::Result;

pub use uplink::UplinkDriver;

/// Resolved session facts returned by [`ReplDriver::setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Compiled-output root the session resolves stack frames against and
    /// the compiler writes modules into.
    pub output_root: PathBuf,
}

/// Uniform surface between an embedding host and one remote session.
pub trait ReplDriver: Send {
    /// Establish the transport, start the reader loop, and run the
    /// bootstrap handshake.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) when the
    /// connect fails and [`AppError::Bootstrap`](crate::AppError::Bootstrap)
    /// when a handshake step fails; no partially-bootstrapped session is
    /// retained.
    fn setup(&mut self) -> Pin<Box<dyn Future<Output = Result<SessionInfo>> + Send + '_>>;

    /// Evaluate `script` on the remote host and wait for its response.
    ///
    /// `source_label` names the form for engine stack traces; `line_hint`
    /// records where the form started in the caller's buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`](crate::AppError::Protocol) on a
    /// malformed response payload (fatal to this call) and
    /// [`AppError::Transport`](crate::AppError::Transport) when called with
    /// no established session.
    fn evaluate<'a>(
        &'a mut self,
        source_label: &'a str,
        line_hint: u32,
        script: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<EvalResponse>> + Send + 'a>>;

    /// Import already-compiled modules by name through the patched loader.
    ///
    /// Each module becomes one small control instruction over the command
    /// socket; the module bytes flow through the bulk volume.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Eval`](crate::AppError::Eval) when the remote
    /// loader reports a failed import.
    fn load<'a>(
        &'a mut self,
        modules: &'a [String],
        location_hint: Option<&'a Path>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Release the bulk-transfer volume, then close the transport and let
    /// the reader loop exit.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) if the
    /// reader task failed during close.
    fn teardown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Translate a raw engine trace into canonical frames.
    fn parse_stacktrace(&self, raw: &str) -> Vec<StackFrame>;

    /// Format `frames` for human display on the session's console.
    fn print_stacktrace(&self, frames: &[StackFrame]);
}
