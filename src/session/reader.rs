//! Session reader task.
//!
//! Reads the sentinel-framed byte stream from the remote host, decodes it
//! through [`WireCodec`], and dispatches the two event kinds:
//!
//! | Event                  | Destination                                  |
//! |------------------------|----------------------------------------------|
//! | [`WireEvent::Response`]| The armed [`ResponseSlot`] (one per request) |
//! | [`WireEvent::Inline`]  | The caller's output sink (`mpsc` channel)    |
//!
//! On end-of-stream — or on a decode error, which this strictly
//! request/response protocol cannot recover from — an armed slot receives
//! [`SlotValue::Closed`] so the blocked evaluator unblocks exactly once,
//! and the task exits. The reader is the sole fulfiller of response slots.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::slot::{ResponseSlot, SlotValue};
use crate::wire::codec::{WireCodec, WireEvent};
use crate::Result;

/// Session reader task — decodes wire events until the stream ends.
///
/// Drives a [`FramedRead`] over `stream` using [`WireCodec`]. Response
/// payloads fulfill `slot`; a response arriving with nothing armed is
/// logged and dropped, never held for a later call. Inline output is
/// forwarded through `inline_tx`; if the sink is gone the text is discarded
/// and the stream keeps draining, since responses still matter.
///
/// # Cancellation
///
/// Respects `cancel`: when the token fires the reader exits without
/// touching the slot (teardown owns unblocking at that point).
///
/// # Errors
///
/// Returns `Ok(())` on clean EOF, cancellation, and stream corruption —
/// corruption is surfaced to the pending call as stream closure, not as a
/// task error.
pub async fn run_reader<R>(
    session_id: String,
    stream: R,
    slot: ResponseSlot,
    inline_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(stream, WireCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(session_id, "reader: cancellation received, stopping");
                break;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!(session_id, "reader: end of stream");
                        if slot.fulfill(SlotValue::Closed) {
                            debug!(session_id, "reader: closed marker delivered to pending call");
                        }
                        break;
                    }

                    Some(Err(err)) => {
                        // No framing recovery exists on this wire; treat any
                        // decode failure as loss of the stream.
                        warn!(session_id, error = %err, "reader: stream corrupt, stopping");
                        let _ = slot.fulfill(SlotValue::Closed);
                        break;
                    }

                    Some(Ok(WireEvent::Response(payload))) => {
                        if !slot.fulfill(SlotValue::Response(payload)) {
                            warn!(
                                session_id,
                                "reader: response arrived with no pending call, dropping"
                            );
                        }
                    }

                    Some(Ok(WireEvent::Inline(text))) => {
                        if inline_tx.send(text).await.is_err() {
                            debug!(session_id, "reader: output sink closed, discarding inline text");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
