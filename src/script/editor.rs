//! Breakpoint insertion and removal
//!
//! Editing never touches the file system; callers persist the returned script
//! through [`super::ScriptStore`]. Insertion is not deduplicated; two sentinels
//! at the same spot pause twice.

use super::{BuildScript, Directive, ScriptError};
use tracing::debug;

/// Returns a copy of `script` with a breakpoint inserted before `line`.
///
/// `line` is 1-based and may be one past the end to append a trailing
/// breakpoint. Anything outside `1..=len + 1` is rejected and the input is
/// left as it was.
pub fn set_breakpoint(script: &BuildScript, line: usize) -> Result<BuildScript, ScriptError> {
    let len = script.len();
    if line == 0 || line > len + 1 {
        return Err(ScriptError::InvalidLine { line, len });
    }

    let mut directives = script.directives().to_vec();
    directives.insert(line - 1, Directive::Breakpoint);
    debug!(line, total = directives.len(), "Inserted breakpoint");

    Ok(BuildScript::new(directives))
}

/// 1-based line numbers of every breakpoint, in order
pub fn breakpoint_lines(script: &BuildScript) -> Vec<usize> {
    script
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_breakpoint())
        .map(|(idx, _)| idx + 1)
        .collect()
}

/// Removes every breakpoint, returning the new script and how many were removed
pub fn clear_breakpoints(script: &BuildScript) -> (BuildScript, usize) {
    let before = script.len();
    let cleared: BuildScript = script
        .iter()
        .filter(|d| !d.is_breakpoint())
        .cloned()
        .collect();
    let removed = before - cleared.len();
    (cleared, removed)
}
