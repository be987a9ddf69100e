//! Boundary to the bulk file channel.
//!
//! Compiled module payloads reach the remote host through a
//! separately-provisioned volume (the remote side mounts it and reads
//! files directly), never through the narrow command socket. Provisioning
//! and mounting belong to external tooling; this crate only needs the
//! volume's local output root and a release hook for teardown.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracing::debug;

use crate::Result;

/// Handle to the provisioned bulk-transfer volume.
pub trait AssetVolume: Send + Sync {
    /// Local directory the compiler writes output into; the remote host
    /// sees the same tree through its mount.
    fn output_root(&self) -> &Path;

    /// Release the remote side's hold on the volume during teardown.
    ///
    /// Runs before the command transport closes, so the remote host can
    /// still observe the release.
    fn release(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Directory-backed volume for hosts that share a filesystem with the
/// session (and for tests). Release is a no-op.
#[derive(Debug, Clone)]
pub struct LocalVolume {
    root: PathBuf,
}

impl LocalVolume {
    /// Create a volume rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl AssetVolume for LocalVolume {
    fn output_root(&self) -> &Path {
        &self.root
    }

    fn release(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            debug!(root = %self.root.display(), "local volume released");
            Ok(())
        })
    }
}
