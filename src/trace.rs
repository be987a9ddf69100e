//! Stack-trace translation from remote engine text to canonical frames.
//!
//! The engine emits one candidate frame per line in the form
//! `function@file:///relative/path.js:line:column`. Translation is
//! best-effort: a line that does not match the whole-line grammar is
//! dropped silently and never fails the rest of the trace. Frame order is
//! preserved exactly as emitted — outermost/innermost ordering is the
//! engine's business, not ours.
//!
//! Mapping the resulting compiled-output frames back to pre-compilation
//! sources is a source-map concern that lives outside this crate.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use crate::models::frame::StackFrame;

/// Whole-line grammar for one engine stack frame.
const FRAME_PATTERN: &str = r"^(?P<function>[^@]+)@file:///(?P<path>.+):(?P<line>\d+):(?P<column>\d+)$";

fn frame_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FRAME_PATTERN).ok()).as_ref()
}

/// Translate a raw engine trace into ordered canonical frames.
///
/// Each matching line yields one [`StackFrame`] whose path is the frame's
/// `file:///`-relative path resolved against `source_root` (the compiled
/// output directory). Non-matching lines contribute nothing; a frame is
/// never constructed with partial fields.
#[must_use]
pub fn parse_stacktrace(raw: &str, source_root: &Path) -> Vec<StackFrame> {
    let Some(pattern) = frame_pattern() else {
        return Vec::new();
    };

    raw.lines()
        .filter_map(|line| {
            let frame = parse_frame(pattern, line, source_root);
            if frame.is_none() {
                trace!(line, "dropping unparseable stack line");
            }
            frame
        })
        .collect()
}

/// Format frames for human display, one per line.
#[must_use]
pub fn format_frames(frames: &[StackFrame]) -> String {
    frames
        .iter()
        .map(|frame| format!("  {frame}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_frame(pattern: &Regex, line: &str, source_root: &Path) -> Option<StackFrame> {
    let captures = pattern.captures(line)?;

    Some(StackFrame {
        function: captures.name("function")?.as_str().to_owned(),
        file: source_root.join(captures.name("path")?.as_str()),
        line: captures.name("line")?.as_str().parse().ok()?,
        column: captures.name("column")?.as_str().parse().ok()?,
    })
}
