use crate::config::EngineKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Step through a container build script with breakpoints
#[derive(Parser, Debug)]
#[command(
    name = "breakstep",
    about = "Step through a container build script with breakpoints",
    version,
    author,
    long_about = "breakstep runs the RUN instructions of a build script one at a time \
                  against a working container, stops at every '# BREAKPOINT' line to \
                  open an interactive shell inside it, and commits the result as an \
                  image once the script completes."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Insert a breakpoint before a line of a build script",
        long_about = "Inserts a '# BREAKPOINT' line so that it becomes line LINE, shifting \
                      the existing line LINE and everything after it down by one. LINE may \
                      be one past the last line to break after the final instruction.\n\n\
                      Examples:\n  \
                      breakstep set-breakpoint Dockerfile 3"
    )]
    SetBreakpoint(SetBreakpointArgs),

    #[command(
        about = "Run a build script, pausing at breakpoints",
        long_about = "Creates a working container from the base image, runs every RUN \
                      instruction in order, opens a shell at each breakpoint and commits \
                      the container as an image when the script completes.\n\n\
                      Examples:\n  \
                      breakstep build Dockerfile\n  \
                      breakstep build Dockerfile --engine docker --base-image debian:12\n  \
                      breakstep build Dockerfile --tag localhost/app:debug --format json"
    )]
    Build(BuildArgs),

    #[command(about = "List the breakpoint lines of a build script")]
    Breakpoints(ScriptArgs),

    #[command(about = "Remove every breakpoint from a build script")]
    ClearBreakpoints(ScriptArgs),

    #[command(
        about = "Resume an interrupted build (not supported)",
        long_about = "Reserved for resuming an interrupted build. Builds cannot be resumed \
                      across process restarts; this command always exits with status 2."
    )]
    Continue,
}

#[derive(Parser, Debug, Clone)]
pub struct SetBreakpointArgs {
    #[arg(value_name = "FILE", help = "Build script to edit in place")]
    pub file: PathBuf,

    #[arg(value_name = "LINE", help = "1-based line the breakpoint will occupy")]
    pub line: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct ScriptArgs {
    #[arg(value_name = "FILE", help = "Build script")]
    pub file: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(value_name = "FILE", help = "Build script to run")]
    pub file: PathBuf,

    #[arg(
        short = 'e',
        long,
        value_enum,
        help = "Build engine (defaults to BREAKSTEP_ENGINE or buildah)"
    )]
    pub engine: Option<EngineArg>,

    #[arg(long, value_name = "REF", help = "Image the working container starts from")]
    pub base_image: Option<String>,

    #[arg(short = 't', long, value_name = "REF", help = "Reference to commit the result as")]
    pub tag: Option<String>,

    #[arg(long, value_name = "PATH", help = "Shell opened at breakpoints")]
    pub shell: Option<String>,

    #[arg(long, help = "Keep the working container when the build fails")]
    pub keep_failed: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Report format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineArg {
    Buildah,
    Docker,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Buildah => EngineKind::Buildah,
            EngineArg::Docker => EngineKind::Docker,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_set_breakpoint_args() {
        let args = CliArgs::parse_from(["breakstep", "set-breakpoint", "Dockerfile", "3"]);
        match args.command {
            Commands::SetBreakpoint(bp) => {
                assert_eq!(bp.file, PathBuf::from("Dockerfile"));
                assert_eq!(bp.line, 3);
            }
            _ => panic!("Expected SetBreakpoint command"),
        }
    }

    #[test]
    fn test_set_breakpoint_rejects_non_numeric_line() {
        let result = CliArgs::try_parse_from(["breakstep", "set-breakpoint", "Dockerfile", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_build_args() {
        let args = CliArgs::parse_from(["breakstep", "build", "Dockerfile"]);
        match args.command {
            Commands::Build(build) => {
                assert_eq!(build.file, PathBuf::from("Dockerfile"));
                assert!(build.engine.is_none());
                assert!(build.base_image.is_none());
                assert!(build.tag.is_none());
                assert!(build.shell.is_none());
                assert!(!build.keep_failed);
                assert_eq!(build.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_build_with_options() {
        let args = CliArgs::parse_from([
            "breakstep",
            "build",
            "Dockerfile",
            "--engine",
            "docker",
            "--base-image",
            "debian:12",
            "--tag",
            "localhost/app:debug",
            "--shell",
            "/bin/bash",
            "--keep-failed",
            "--format",
            "yaml",
        ]);

        match args.command {
            Commands::Build(build) => {
                assert_eq!(build.engine, Some(EngineArg::Docker));
                assert_eq!(build.base_image.as_deref(), Some("debian:12"));
                assert_eq!(build.tag.as_deref(), Some("localhost/app:debug"));
                assert_eq!(build.shell.as_deref(), Some("/bin/bash"));
                assert!(build.keep_failed);
                assert_eq!(build.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let result =
            CliArgs::try_parse_from(["breakstep", "build", "Dockerfile", "--engine", "podman"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_script_commands() {
        let args = CliArgs::parse_from(["breakstep", "breakpoints", "Dockerfile"]);
        assert!(matches!(args.command, Commands::Breakpoints(_)));

        let args = CliArgs::parse_from(["breakstep", "clear-breakpoints", "Dockerfile"]);
        assert!(matches!(args.command, Commands::ClearBreakpoints(_)));

        let args = CliArgs::parse_from(["breakstep", "continue"]);
        assert!(matches!(args.command, Commands::Continue));
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["breakstep", "-v", "continue"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["breakstep", "continue", "--log-level", "debug"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));

        assert!(CliArgs::try_parse_from(["breakstep", "-v", "-q", "continue"]).is_err());
    }

    #[test]
    fn test_engine_arg_conversion() {
        assert_eq!(EngineKind::from(EngineArg::Docker), EngineKind::Docker);
        assert_eq!(EngineKind::from(EngineArg::Buildah), EngineKind::Buildah);
    }
}
