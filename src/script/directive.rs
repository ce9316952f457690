//! Line classification for build scripts
//!
//! Every line of a build script maps to exactly one [`Directive`]. The mapping
//! is computed once per line when the script is loaded; everything downstream
//! matches on the variant instead of re-inspecting the text.

use std::fmt;

/// Line that marks a breakpoint. A Dockerfile comment, so an annotated script
/// is still a valid build definition.
pub const BREAKPOINT_SENTINEL: &str = "# BREAKPOINT";

/// Prefix of a shell-command instruction, including the separating space.
pub const RUN_PREFIX: &str = "RUN ";

/// One classified line of a build script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Pause execution and hand the working environment to the operator
    Breakpoint,

    /// Shell command; holds everything after [`RUN_PREFIX`]
    RunCommand(String),

    /// Any other line, carried through without being executed
    Raw(String),
}

impl Directive {
    /// Classifies a single line of script text.
    ///
    /// The breakpoint sentinel must match the whole line. A command needs the
    /// `RUN` keyword followed by a space, so a bare `RUN` is raw text.
    pub fn classify(line: &str) -> Self {
        if line == BREAKPOINT_SENTINEL {
            Directive::Breakpoint
        } else if let Some(payload) = line.strip_prefix(RUN_PREFIX) {
            Directive::RunCommand(payload.to_string())
        } else {
            Directive::Raw(line.to_string())
        }
    }

    /// Splits a command payload into its argument vector.
    ///
    /// Tokens are whitespace-delimited with no quoting or escaping. Returns
    /// `None` for anything that is not a command. An all-blank payload yields
    /// an empty vector, which the stepper treats as a no-op.
    pub fn command_vector(&self) -> Option<Vec<String>> {
        match self {
            Directive::RunCommand(payload) => Some(
                payload
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn is_breakpoint(&self) -> bool {
        matches!(self, Directive::Breakpoint)
    }

    /// Reconstructs the source line. `classify(d.to_line()) == d` for every
    /// directive produced by `classify`.
    pub fn to_line(&self) -> String {
        match self {
            Directive::Breakpoint => BREAKPOINT_SENTINEL.to_string(),
            Directive::RunCommand(payload) => format!("{}{}", RUN_PREFIX, payload),
            Directive::Raw(text) => text.clone(),
        }
    }

    /// Short label used in logs and progress events
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Breakpoint => "breakpoint",
            Directive::RunCommand(_) => "run",
            Directive::Raw(_) => "raw",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        sentinel = { "# BREAKPOINT", "breakpoint" },
        run = { "RUN echo hi", "run" },
        run_blank_payload = { "RUN    ", "run" },
        bare_run = { "RUN", "raw" },
        lowercase_run = { "run echo hi", "raw" },
        run_tab_separator = { "RUN\techo", "raw" },
        from = { "FROM alpine:latest", "raw" },
        comment = { "# just a comment", "raw" },
        indented_sentinel = { "  # BREAKPOINT", "raw" },
        sentinel_trailing_text = { "# BREAKPOINT here", "raw" },
        empty = { "", "raw" },
    )]
    fn test_classify(line: &str, expected_kind: &str) {
        assert_eq!(Directive::classify(line).kind(), expected_kind);
    }

    #[test]
    fn test_command_vector_splits_on_whitespace() {
        let directive = Directive::classify("RUN apk add   --no-cache\tcurl");
        assert_eq!(
            directive.command_vector(),
            Some(vec![
                "apk".to_string(),
                "add".to_string(),
                "--no-cache".to_string(),
                "curl".to_string()
            ])
        );
    }

    #[test]
    fn test_command_vector_does_not_honor_quotes() {
        let directive = Directive::classify(r#"RUN echo "a b""#);
        assert_eq!(
            directive.command_vector(),
            Some(vec![
                "echo".to_string(),
                "\"a".to_string(),
                "b\"".to_string()
            ])
        );
    }

    #[test]
    fn test_blank_payload_has_no_tokens() {
        let directive = Directive::classify("RUN    ");
        assert_eq!(directive.command_vector(), Some(vec![]));
    }

    #[test]
    fn test_non_commands_have_no_vector() {
        assert!(Directive::Breakpoint.command_vector().is_none());
        assert!(Directive::Raw("FROM scratch".into()).command_vector().is_none());
    }

    #[test]
    fn test_to_line_is_lossless() {
        for line in ["RUN  spaced  out ", "# BREAKPOINT", "COPY . /app", ""] {
            assert_eq!(Directive::classify(line).to_line(), line);
        }
    }
}
