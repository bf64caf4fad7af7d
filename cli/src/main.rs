mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, RunArgs};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(args: &RunArgs) -> Result<()> {
  // The ANSI screen owns the terminal; keep stderr quiet unless asked.
  let default_filter = if args.plain || args.log_file.is_some() {
    "info"
  } else {
    "warn"
  };
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
  let builder = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true);

  match &args.log_file {
    Some(path) => {
      let file =
        std::fs::File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
      builder.with_ansi(false).with_writer(std::sync::Mutex::new(file)).init();
    }
    None => builder.with_writer(std::io::stderr).init(),
  }
  Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  let cli_args = Cli::parse();

  match cli_args.command {
    Commands::Run(run_args) => {
      init_tracing(&run_args)?;
      commands::run::run(run_args).await
    }
  }
}
