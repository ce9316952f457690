//! Build scripts: classification, storage and breakpoint editing
//!
//! A [`BuildScript`] is an ordered list of [`Directive`]s, one per source line.
//! Position in the list is the execution order, and `index + 1` is the line
//! number the operator sees. Nothing stores a line number; inserting a
//! directive renumbers everything after it implicitly.

pub mod directive;
pub mod editor;
pub mod store;

pub use directive::{Directive, BREAKPOINT_SENTINEL, RUN_PREFIX};
pub use editor::{breakpoint_lines, clear_breakpoints, set_breakpoint};
pub use store::ScriptStore;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, saving or editing a script
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Breakpoint position outside `1..=len + 1`
    #[error("Invalid line number {line}: script has {len} lines, valid positions are 1 to {}", .len + 1)]
    InvalidLine { line: usize, len: usize },

    /// Reading or writing the script file failed
    #[error("Failed to access script {}: {source}", .path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ordered sequence of classified script lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildScript {
    directives: Vec<Directive>,
}

impl BuildScript {
    pub fn new(directives: Vec<Directive>) -> Self {
        Self { directives }
    }

    /// Classifies every line of `text`.
    ///
    /// A trailing `\r` is dropped from each line so CRLF files load the same
    /// as LF files.
    pub fn parse(text: &str) -> Self {
        text.lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .map(Directive::classify)
            .collect()
    }

    /// Renders the script back to text, one line per directive, each
    /// terminated by `\n`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for directive in &self.directives {
            out.push_str(&directive.to_line());
            out.push('\n');
        }
        out
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Directive> {
        self.directives.iter()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Directive at a 1-based line number
    pub fn line(&self, line: usize) -> Option<&Directive> {
        line.checked_sub(1).and_then(|idx| self.directives.get(idx))
    }

    pub fn breakpoint_count(&self) -> usize {
        self.directives.iter().filter(|d| d.is_breakpoint()).count()
    }

    pub fn command_count(&self) -> usize {
        self.directives
            .iter()
            .filter(|d| matches!(d, Directive::RunCommand(_)))
            .count()
    }

    pub fn into_directives(self) -> Vec<Directive> {
        self.directives
    }
}

impl FromIterator<Directive> for BuildScript {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a BuildScript {
    type Item = &'a Directive;
    type IntoIter = std::slice::Iter<'a, Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.directives.iter()
    }
}
