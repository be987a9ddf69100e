//! Owning handle for one remote-host session.
//!
//! A [`Connection`] holds the write half of the duplex stream, the
//! single response slot, and the background reader task. Exactly one
//! connection is live per session; dropping it (via [`Connection::close`])
//! tears the reader down.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Encoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::eval::EvalResponse;
use crate::session::reader::run_reader;
use crate::session::slot::{ResponseSlot, SlotValue};
use crate::wire::codec::WireCodec;
use crate::{AppError, Result};

/// Live session with the remote execution host.
///
/// Evaluation is strictly request/response: [`Connection::evaluate`] takes
/// `&mut self`, so a second call cannot start while one is outstanding.
/// Callers sharing a connection across tasks must serialize access
/// themselves (a mutex around the connection is enough).
pub struct Connection {
    session_id: String,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    slot: ResponseSlot,
    reader_task: JoinHandle<Result<()>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("slot_armed", &self.slot.is_armed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect to the remote host over TCP and start the reader task.
    ///
    /// Inline console output decoded from the stream is delivered through
    /// `inline_tx` as it arrives, independent of any pending response.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`] when the connect fails or does not
    /// complete within `connect_timeout`.
    pub async fn connect(
        addr: &str,
        connect_timeout: Duration,
        inline_tx: mpsc::Sender<String>,
    ) -> Result<Self> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                AppError::Transport(format!(
                    "connect to {addr} timed out after {connect_timeout:?}"
                ))
            })?
            .map_err(|err| AppError::Transport(format!("failed to connect to {addr}: {err}")))?;

        let conn = Self::from_stream(stream, inline_tx);
        info!(session_id = conn.session_id, addr, "connected to remote host");
        Ok(conn)
    }

    /// Wrap an already-established duplex stream.
    ///
    /// Splits the stream, spawns the reader task, and returns the owning
    /// handle. Tests use this with an in-memory duplex pipe.
    pub fn from_stream<S>(stream: S, inline_tx: mpsc::Sender<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let session_id = Uuid::new_v4().to_string();
        let (read_half, write_half) = tokio::io::split(stream);

        let slot = ResponseSlot::new();
        let cancel = CancellationToken::new();
        let reader_task = tokio::spawn(run_reader(
            session_id.clone(),
            read_half,
            slot.clone(),
            inline_tx,
            cancel.clone(),
        ));

        Self {
            session_id,
            writer: Box::new(write_half),
            slot,
            reader_task,
            cancel,
        }
    }

    /// Identifier for this session, used in log correlation.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send `script` for execution and wait for its response.
    ///
    /// Arms a fresh response slot, frames and writes the script, then
    /// awaits the reader's delivery. Stream closure — before or during the
    /// wait — yields the fixed transport-error response rather than an
    /// `Err`, and is never retried.
    ///
    /// # Errors
    ///
    /// - [`AppError::Protocol`] if the script contains a reserved control
    ///   byte, if another evaluation is somehow outstanding, or if the
    ///   response payload is not the expected structured record. A payload
    ///   parse failure is fatal to this call and is not recovered.
    pub async fn evaluate(&mut self, script: &str) -> Result<EvalResponse> {
        if self.reader_task.is_finished() {
            // The stream already closed; nothing can fulfill a new slot.
            return Ok(EvalResponse::transport_closed());
        }

        let receiver = self.slot.arm()?;

        let mut framed = BytesMut::new();
        if let Err(err) = WireCodec::new().encode(script, &mut framed) {
            self.slot.disarm();
            return Err(err);
        }

        if let Err(err) = self.write_frame(&framed).await {
            // The request never reached the remote host, so no response can
            // arrive; release the slot and surface the transport failure.
            warn!(session_id = self.session_id, error = %err, "script write failed");
            self.slot.disarm();
            return Ok(EvalResponse::transport_closed());
        }
        debug!(
            session_id = self.session_id,
            bytes = framed.len(),
            "script submitted"
        );

        match receiver.await {
            Ok(SlotValue::Response(raw)) => EvalResponse::parse(&raw),
            Ok(SlotValue::Closed) | Err(_) => Ok(EvalResponse::transport_closed()),
        }
    }

    /// Close the transport and wait for the reader task to exit.
    ///
    /// Shuts down the write side (the remote host observes EOF), cancels
    /// the reader token, and joins the task.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`] if the reader task panicked.
    pub async fn close(mut self) -> Result<()> {
        if let Err(err) = self.writer.shutdown().await {
            // The stream may already be gone; closing remains best-effort.
            debug!(session_id = self.session_id, error = %err, "writer shutdown failed");
        }
        self.cancel.cancel();

        match self.reader_task.await {
            Ok(_) => {
                info!(session_id = self.session_id, "session closed");
                Ok(())
            }
            Err(err) => Err(AppError::Transport(format!(
                "reader task failed during close: {err}"
            ))),
        }
    }

    async fn write_frame(&mut self, framed: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(framed).await?;
        self.writer.flush().await
    }
}
