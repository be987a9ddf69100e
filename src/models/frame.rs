//! Canonical stack frame model.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// One translated stack frame from a remote engine trace.
///
/// All fields are required: a line that cannot supply every field is
/// discarded by the translator rather than constructed partially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Function name as reported by the engine.
    pub function: String,
    /// Absolute path into the compiled output, resolved against the
    /// session's source root.
    pub file: PathBuf,
    /// 1-based line number in the compiled file.
    pub line: u32,
    /// Column number in the compiled file.
    pub column: u32,
}

impl Display for StackFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}:{}:{})",
            self.function,
            self.file.display(),
            self.line,
            self.column
        )
    }
}
