//! Ordered bootstrap handshake for the remote module loader.
//!
//! After the transport is up and the reader loop is running, a fixed
//! sequence of evaluations brings the remote Closure-style module system
//! into a usable state: install the import hook, load the loader runtime
//! and the generated dependency manifest through it, neutralize the
//! duplicate-definition check, load the core runtime and wire its print
//! sink, and finally replace `goog.require` with a loaded-set-aware
//! version.
//!
//! The sequence is strictly ordered and failure-sensitive: the first
//! failing step aborts the whole handshake with
//! [`AppError::Bootstrap`] identifying the step, later steps never run, and
//! nothing is retried. No partial bootstrap is usable state.

pub mod scripts;

use tracing::{debug, info};

use crate::models::eval::EvalStatus;
use crate::session::Connection;
use crate::{AppError, Result};

/// One action in the ordered handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    /// Install the import hook routing module paths to the bulk file volume.
    InstallImportHook,
    /// Load the module loader's own runtime through the hook.
    LoadLoaderRuntime,
    /// Load the generated name-to-path dependency manifest.
    LoadDependencyManifest,
    /// Force the loader's already-present check to answer negative.
    SuppressProvidedCheck,
    /// Load the core runtime library and install the print sink.
    LoadCoreRuntime,
    /// Replace `goog.require` with the loaded-set-aware version.
    PatchRequire,
}

impl BootstrapStep {
    /// 1-based position of this step in the handshake order.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::InstallImportHook => 1,
            Self::LoadLoaderRuntime => 2,
            Self::LoadDependencyManifest => 3,
            Self::SuppressProvidedCheck => 4,
            Self::LoadCoreRuntime => 5,
            Self::PatchRequire => 6,
        }
    }

    /// Short human-readable name for diagnostics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::InstallImportHook => "install import hook",
            Self::LoadLoaderRuntime => "load loader runtime",
            Self::LoadDependencyManifest => "load dependency manifest",
            Self::SuppressProvidedCheck => "suppress provided check",
            Self::LoadCoreRuntime => "load core runtime",
            Self::PatchRequire => "patch require",
        }
    }
}

/// Inputs the handshake needs beyond the connection itself.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Path of the generated dependency manifest, relative to the compiled
    /// output root on the remote volume.
    pub manifest_path: String,
    /// Name of the core runtime module to load through the patched loader.
    pub core_module: String,
}

/// Run the full ordered handshake on `conn`.
///
/// # Errors
///
/// Returns [`AppError::Bootstrap`] naming the failing step and its cause.
/// A step fails when its evaluation cannot complete (transport or protocol
/// failure) or when the remote engine reports a non-success status.
pub async fn bootstrap(conn: &mut Connection, options: &BootstrapOptions) -> Result<()> {
    run_step(
        conn,
        BootstrapStep::InstallImportHook,
        &scripts::install_import_hook(),
    )
    .await?;
    run_step(
        conn,
        BootstrapStep::LoadLoaderRuntime,
        &scripts::load_loader_runtime(),
    )
    .await?;
    run_step(
        conn,
        BootstrapStep::LoadDependencyManifest,
        &scripts::load_dependency_manifest(&options.manifest_path),
    )
    .await?;
    run_step(
        conn,
        BootstrapStep::SuppressProvidedCheck,
        &scripts::suppress_provided_check(),
    )
    .await?;
    run_step(
        conn,
        BootstrapStep::LoadCoreRuntime,
        &scripts::require_module(&options.core_module),
    )
    .await?;
    run_step(
        conn,
        BootstrapStep::LoadCoreRuntime,
        &scripts::install_print_sink(&options.core_module),
    )
    .await?;
    run_step(conn, BootstrapStep::PatchRequire, &scripts::patch_require()).await?;

    info!(session_id = conn.session_id(), "bootstrap complete");
    Ok(())
}

async fn run_step(conn: &mut Connection, step: BootstrapStep, script: &str) -> Result<()> {
    debug!(
        session_id = conn.session_id(),
        step = step.index(),
        label = step.label(),
        "running bootstrap step"
    );

    let response = conn.evaluate(script).await.map_err(|err| AppError::Bootstrap {
        step,
        cause: Box::new(err),
    })?;

    let cause = match response.status {
        EvalStatus::Success => return Ok(()),
        EvalStatus::Exception => {
            AppError::Eval(format!("remote evaluation threw: {}", response.value))
        }
        EvalStatus::Error => AppError::Transport(response.value),
    };

    Err(AppError::Bootstrap {
        step,
        cause: Box::new(cause),
    })
}
