use anyhow::{Context, Result};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
  if quiet {
    return LevelFilter::OFF;
  }

  match verbosity {
    0 => LevelFilter::WARN,
    1 => LevelFilter::INFO,
    2 => LevelFilter::DEBUG,
    _ => LevelFilter::TRACE,
  }
}

/// Logs to stderr so stdout only carries results. `RUST_LOG`, when set, wins
/// over the `-v`/`-q` flags.
pub fn setup_logging(verbosity: u8, quiet: bool) -> Result<()> {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::default().add_directive(level_filter(verbosity, quiet).into()));

  let stderr_layer = fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(false)
    .compact();

  tracing_subscriber::registry()
    .with(filter)
    .with(stderr_layer)
    .try_init()
    .context("install subscriber")
}
