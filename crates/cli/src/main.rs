mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pomgen_lib::cache::{CacheError, RunOptions};

use crate::cmd::RunArgs;
use crate::output::{OutputFormat, print_error};

/// Exit status for a run stopped by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// pomgen - Generate BUILD descriptors from Maven pom.xml files
#[derive(Parser)]
#[command(name = "pomgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Repository root
  #[arg(default_value = ".")]
  repo: PathBuf,

  /// Regenerate everything even if nothing changed
  #[arg(long)]
  rebuild: bool,

  /// Ignore a cache index written by a newer pomgen
  #[arg(long)]
  force: bool,

  /// Wipe this branch's cache before running
  #[arg(long)]
  clean: bool,

  /// Wipe the whole cache before running
  #[arg(long)]
  clean_all: bool,

  /// Disable the cache for this run
  #[arg(long)]
  no_cache: bool,

  /// Cache root (overrides pomgen.json and POMGEN_CACHE_DIR)
  #[arg(long, value_name = "PATH")]
  cache_dir: Option<PathBuf>,

  /// Log level; RUST_LOG takes precedence
  #[arg(
    short = 'l',
    long = "log-level",
    default_value = "warn",
    value_parser = ["error", "warn", "info", "debug", "trace"]
  )]
  log_level: String,

  /// Output format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

fn init_logging(level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .without_time()
    .with_writer(std::io::stderr)
    .init();
}

fn is_interrupted(error: &anyhow::Error) -> bool {
  error
    .chain()
    .any(|cause| matches!(cause.downcast_ref::<CacheError>(), Some(CacheError::Interrupted)))
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(&cli.log_level);

  let args = RunArgs {
    repo: cli.repo,
    options: RunOptions {
      rebuild: cli.rebuild,
      force: cli.force,
      clean: cli.clean,
      clean_all: cli.clean_all,
    },
    no_cache: cli.no_cache,
    cache_dir: cli.cache_dir,
    output: cli.output,
  };

  match cmd::cmd_run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) if is_interrupted(&e) => {
      print_error("Interrupted");
      ExitCode::from(EXIT_INTERRUPTED)
    }
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
