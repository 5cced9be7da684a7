mod bench;
mod config;
mod ext;
mod format;
mod logging;
mod run;
#[cfg(all(test, unix))]
mod stub;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};

use self::{bench::Bench, config::Config};

#[derive(Parser)]
#[command(version, about = "Benchmark prototein folding executables")]
struct Args {
  /// TOML file overriding the built-in targets and cases.
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,
  /// Log more (-v info, -vv debug, -vvv trace).
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,
  /// Disable logging.
  #[arg(short, long, global = true, conflicts_with = "verbose")]
  quiet: bool,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the benchmark cases and their expected scores.
  Cases,
  /// Run one target on one sequence, printing its score and duration.
  Run {
    /// Executable name, resolved in the executables directory.
    #[arg(short, long)]
    target: String,
    sequence: String,
    /// Kill the target after this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
  },
  /// Run every target over every case and print a report.
  Bench {
    /// Kill each run after this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
  },
}

fn main() -> Result<()> {
  let args = Args::parse();

  logging::setup_logging(args.verbose, args.quiet).context("logging")?;

  let config = match &args.config {
    Some(path) => Config::load(path).with_context(|| format!("config {path:?}"))?,
    None => Config::default(),
  };

  match args.command {
    Command::Cases => {
      print!("{}", format::format_cases(config.cases()).context("format")?);
    }
    Command::Run {
      target,
      sequence,
      timeout,
    } => {
      let target = config.target(&target);
      let result = run::run_with(&target, &sequence, timeout.map(Duration::from_secs))
        .with_context(|| format!("{target} {sequence:?}"))?;

      println!("{} {}", result.score, result.duration);
    }
    Command::Bench { timeout } => {
      let mut bench = Bench::new(&config, timeout.map(Duration::from_secs));
      bench.bench();

      print!("{}", format::format(config.cases(), &bench.results).context("format")?);
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_is_well_formed() {
    Args::command().debug_assert();
  }

  #[test]
  fn parses_run() {
    let args = Args::try_parse_from(["prototein-bench", "-vv", "run", "-t", "fold", "HPHPHP"]).unwrap();

    assert_eq!(args.verbose, 2);
    match args.command {
      Command::Run {
        target,
        sequence,
        timeout,
      } => {
        assert_eq!(target, "fold");
        assert_eq!(sequence, "HPHPHP");
        assert_eq!(timeout, None);
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn parses_bench_with_config() {
    let args = Args::try_parse_from(["prototein-bench", "bench", "--timeout", "5", "-c", "bench.toml"]).unwrap();

    assert_eq!(args.config, Some(PathBuf::from("bench.toml")));
    assert!(matches!(args.command, Command::Bench { timeout: Some(5) }));
  }

  #[test]
  fn rejects_zero_timeout_and_quiet_verbose() {
    assert!(Args::try_parse_from(["prototein-bench", "bench", "--timeout", "0"]).is_err());
    assert!(Args::try_parse_from(["prototein-bench", "-q", "-v", "cases"]).is_err());
    assert!(Args::try_parse_from(["prototein-bench", "run", "HHHP"]).is_err());
  }
}
