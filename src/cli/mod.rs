pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{BuildArgs, CliArgs, Commands, ScriptArgs, SetBreakpointArgs};
pub use output::{OutputFormat, OutputFormatter};
