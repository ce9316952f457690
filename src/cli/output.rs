//! Output formatting for build reports
//!
//! # Example
//!
//! ```ignore
//! use breakstep::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_report(&report)?);
//! ```

use anyhow::{Context, Result};
use std::path::Path;

use crate::stepper::BuildReport;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &BuildReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize build report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize build report to YAML")
            }
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    fn format_report_human(&self, report: &BuildReport) -> String {
        let mut output = String::new();

        output.push_str("\u{2713} Build Committed\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Image:     {}\n", report.reference));
        output.push_str(&format!("Image ID:  {}\n", report.image_id));
        output.push_str(&format!("Base:      {}\n", report.base_image));
        output.push_str(&format!("Engine:    {}\n\n", report.engine));

        output.push_str("Steps:\n");
        output.push_str(&format!(
            "\u{251C}\u{2500} Directives:   {}\n",
            report.directives
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Commands run: {}\n",
            report.commands_executed
        ));
        output.push_str(&format!(
            "\u{2514}\u{2500} Breakpoints:  {}\n",
            report.breakpoints_hit
        ));

        output.push_str(&format!(
            "\nStarted {} and finished in {}ms\n",
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.duration_ms
        ));

        output
    }
}

/// Human listing for the `breakpoints` command
pub fn format_breakpoint_lines(path: &Path, lines: &[usize]) -> String {
    if lines.is_empty() {
        return format!("No breakpoints in {}\n", path.display());
    }

    let mut output = format!("Breakpoints in {}:\n", path.display());
    for line in lines {
        output.push_str(&format!("  line {}\n", line));
    }
    output
}
