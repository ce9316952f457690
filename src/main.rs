use breakstep::cli::commands::{CliArgs, Commands};
use breakstep::cli::handlers::{
    handle_breakpoints, handle_build, handle_clear_breakpoints, handle_continue,
    handle_set_breakpoint,
};
use breakstep::util::{init_logging, LoggingConfig};
use breakstep::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("breakstep v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::SetBreakpoint(bp_args) => handle_set_breakpoint(bp_args).await,
        Commands::Build(build_args) => handle_build(build_args, args.quiet).await,
        Commands::Breakpoints(script_args) => handle_breakpoints(script_args).await,
        Commands::ClearBreakpoints(script_args) => handle_clear_breakpoints(script_args).await,
        Commands::Continue => handle_continue().await,
    };

    std::process::exit(exit_code);
}
