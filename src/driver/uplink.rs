//! Concrete TCP-backed session driver.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bootstrap::{bootstrap, scripts, BootstrapOptions};
use crate::config::SessionConfig;
use crate::driver::{ReplDriver, SessionInfo};
use crate::models::eval::EvalResponse;
use crate::models::frame::StackFrame;
use crate::session::Connection;
use crate::trace;
use crate::volume::AssetVolume;
use crate::{AppError, Result};

/// One remote session: configuration, bulk volume, and (once set up) the
/// live connection.
pub struct UplinkDriver {
    config: SessionConfig,
    volume: Box<dyn AssetVolume>,
    inline_tx: mpsc::Sender<String>,
    connection: Option<Connection>,
}

impl UplinkDriver {
    /// Create a driver that will connect per `config` and bulk-transfer
    /// through `volume`. Inline console output from the remote host is
    /// delivered through `inline_tx`.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        volume: Box<dyn AssetVolume>,
        inline_tx: mpsc::Sender<String>,
    ) -> Self {
        Self {
            config,
            volume,
            inline_tx,
            connection: None,
        }
    }

    fn live_connection(&mut self) -> Result<&mut Connection> {
        self.connection
            .as_mut()
            .ok_or_else(|| AppError::Transport("session not established".into()))
    }
}

impl ReplDriver for UplinkDriver {
    fn setup(&mut self) -> Pin<Box<dyn Future<Output = Result<SessionInfo>> + Send + '_>> {
        Box::pin(async move {
            let addr = self.config.addr();
            let mut conn = Connection::connect(
                &addr,
                self.config.connect_timeout(),
                self.inline_tx.clone(),
            )
            .await?;

            let options = BootstrapOptions {
                manifest_path: self.config.manifest_path.clone(),
                core_module: self.config.core_module.clone(),
            };
            if let Err(err) = bootstrap(&mut conn, &options).await {
                // A half-bootstrapped loader is not usable state; drop the
                // transport before surfacing the failing step.
                if let Err(close_err) = conn.close().await {
                    warn!(error = %close_err, "close after failed bootstrap");
                }
                return Err(err);
            }

            info!(
                session_id = conn.session_id(),
                addr, "session established"
            );
            self.connection = Some(conn);
            Ok(SessionInfo {
                output_root: self.volume.output_root().to_path_buf(),
            })
        })
    }

    fn evaluate<'a>(
        &'a mut self,
        source_label: &'a str,
        line_hint: u32,
        script: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<EvalResponse>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.live_connection()?;
            debug!(
                session_id = conn.session_id(),
                source_label, line_hint, "evaluating form"
            );

            if source_label.is_empty() {
                conn.evaluate(script).await
            } else {
                // The engine attributes stack frames to the labelled source
                // instead of anonymous input.
                let labelled = format!("{script}\n//# sourceURL={source_label}");
                conn.evaluate(&labelled).await
            }
        })
    }

    fn load<'a>(
        &'a mut self,
        modules: &'a [String],
        location_hint: Option<&'a Path>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.live_connection()?;
            if let Some(hint) = location_hint {
                debug!(
                    session_id = conn.session_id(),
                    hint = %hint.display(),
                    "load location hint (modules resolve by name)"
                );
            }

            for module in modules {
                let response = conn.evaluate(&scripts::require_module(module)).await?;
                if !response.is_success() {
                    return Err(AppError::Eval(format!(
                        "loading module {module} failed: {}",
                        response.value
                    )));
                }
                debug!(session_id = conn.session_id(), module, "module loaded");
            }
            Ok(())
        })
    }

    fn teardown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            // Release the bulk volume while the remote host can still
            // observe it, then close the transport; the reader loop exits
            // on end-of-stream.
            self.volume.release().await?;
            if let Some(conn) = self.connection.take() {
                conn.close().await?;
            }
            Ok(())
        })
    }

    fn parse_stacktrace(&self, raw: &str) -> Vec<StackFrame> {
        trace::parse_stacktrace(raw, self.volume.output_root())
    }

    fn print_stacktrace(&self, frames: &[StackFrame]) {
        println!("{}", trace::format_frames(frames));
    }
}
