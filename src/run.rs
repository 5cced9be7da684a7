use std::{
  io,
  path::PathBuf,
  process::{Child, Command, Output},
  string::FromUtf8Error,
  time::Duration,
};

use thiserror::Error;
use tracing::debug;

use crate::{
  config::ExecutableTarget,
  ext::{ChildExt, CommandExt, ExitStatusExt},
};

#[derive(Debug, Error)]
pub enum RunError {
  #[error("failed to launch {path:?}")]
  Launch {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("stdout is not valid UTF-8")]
  Decode(#[from] FromUtf8Error),

  #[error("expected 2 tokens (score, duration) on stdout, found {found}")]
  Unpack { found: usize },

  #[error("no exit after {timeout:?}, child killed")]
  Timeout { timeout: Duration },

  #[error("failed waiting on child")]
  Io(#[from] io::Error),
}

impl RunError {
  /// Short label used in report cells.
  pub fn label(&self) -> &'static str {
    match self {
      RunError::Launch { .. } => "launch error",
      RunError::Decode(_) => "decode error",
      RunError::Unpack { .. } => "unpack error",
      RunError::Timeout { .. } => "timeout",
      RunError::Io(_) => "io error",
    }
  }
}

/// The two tokens a target prints, kept exactly as printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
  pub score: String,
  pub duration: String,
}

/// Runs `target <sequence>` and parses its stdout into a score and a duration.
/// Blocks until the child exits, however long that takes. The exit status is
/// only logged.
///
/// # Errors
///
/// This will return an error if:
/// - the executable cannot be spawned,
/// - stdout is not UTF-8,
/// - stdout does not hold exactly two whitespace-separated tokens.
pub fn run(target: &ExecutableTarget, sequence: &str) -> Result<RunResult, RunError> {
  let output = spawn(target, sequence)?.wait_with_output()?;

  parse_output(target, output)
}

/// Same as [`run`], but kills the child and returns [`RunError::Timeout`] if
/// it has not exited within `timeout`.
pub fn run_timeout(target: &ExecutableTarget, sequence: &str, timeout: Duration) -> Result<RunResult, RunError> {
  let Some(output) = spawn(target, sequence)?.wait_output_timeout(timeout)? else {
    return Err(RunError::Timeout { timeout });
  };

  parse_output(target, output)
}

pub fn run_with(target: &ExecutableTarget, sequence: &str, timeout: Option<Duration>) -> Result<RunResult, RunError> {
  match timeout {
    Some(timeout) => run_timeout(target, sequence, timeout),
    None => run(target, sequence),
  }
}

fn spawn(target: &ExecutableTarget, sequence: &str) -> Result<Child, RunError> {
  debug!("spawning {target} {sequence:?}");

  Command::new(target.path())
    .arg(sequence)
    .spawn_stdout()
    .map_err(|source| RunError::Launch {
      path: target.path().to_path_buf(),
      source,
    })
}

fn parse_output(target: &ExecutableTarget, output: Output) -> Result<RunResult, RunError> {
  output.status.warn_unsuccessful(target.path());

  let stdout = String::from_utf8(output.stdout)?;

  parse_stdout(&stdout)
}

fn parse_stdout(stdout: &str) -> Result<RunResult, RunError> {
  let tokens: Vec<&str> = stdout.split_whitespace().collect();

  match tokens[..] {
    [score, duration] => Ok(RunResult {
      score: score.to_string(),
      duration: duration.to_string(),
    }),
    _ => Err(RunError::Unpack { found: tokens.len() }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_two_tokens_verbatim() {
    let result = parse_stdout("6 0.0123\n").unwrap();

    assert_eq!(result.score, "6");
    assert_eq!(result.duration, "0.0123");
  }

  #[test]
  fn any_whitespace_separates() {
    let result = parse_stdout("\t 22\r\n1.50e-3  \n").unwrap();

    assert_eq!(result.score, "22");
    assert_eq!(result.duration, "1.50e-3");
  }

  #[test]
  fn wrong_token_count_is_unpack_error() {
    assert!(matches!(parse_stdout(""), Err(RunError::Unpack { found: 0 })));
    assert!(matches!(parse_stdout("   \n"), Err(RunError::Unpack { found: 0 })));
    assert!(matches!(parse_stdout("6"), Err(RunError::Unpack { found: 1 })));
    assert!(matches!(parse_stdout("Max: 6 NESW"), Err(RunError::Unpack { found: 3 })));
  }

  #[cfg(unix)]
  mod process {
    use serial_test::serial;

    use super::*;
    use crate::stub::StubDir;

    #[test]
    #[serial]
    fn returns_stub_tokens() {
      let stubs = StubDir::new();
      let target = stubs.script("fold", "echo '6 0.0123'");

      let result = run(&target, "HPHPHP").unwrap();

      assert_eq!(
        result,
        RunResult {
          score: "6".to_string(),
          duration: "0.0123".to_string(),
        }
      );
    }

    #[test]
    #[serial]
    fn passes_sequence_as_only_argument() {
      let stubs = StubDir::new();
      let target = stubs.script("echo_args", r#"echo "$1" "$#""#);

      let result = run(&target, "PHHPPHPH").unwrap();

      assert_eq!(result.score, "PHHPPHPH");
      assert_eq!(result.duration, "1");
    }

    #[test]
    #[serial]
    fn is_idempotent_for_deterministic_stub() {
      let stubs = StubDir::new();
      let target = stubs.script("fold", "echo 10 0.5");

      let first = run(&target, "HHPPPPHHHP").unwrap();
      let second = run(&target, "HHPPPPHHHP").unwrap();

      assert_eq!(first, second);
    }

    #[test]
    #[serial]
    fn wrong_token_counts_fail() {
      let stubs = StubDir::new();

      for (name, body, count) in [
        ("silent", "true", 0),
        ("one", "echo 6", 1),
        ("three", "echo Max: 6 NESW", 3),
      ] {
        let target = stubs.script(name, body);
        match run(&target, "HHHP") {
          Err(RunError::Unpack { found }) => assert_eq!(found, count, "{name}"),
          other => panic!("{name}: expected unpack error, got {other:?}"),
        }
      }
    }

    #[test]
    #[serial]
    fn missing_executable_is_launch_error() {
      let stubs = StubDir::new();
      let target = ExecutableTarget::new(stubs.path().join("does_not_exist"));

      assert!(matches!(run(&target, "HHHP"), Err(RunError::Launch { .. })));
    }

    #[test]
    #[serial]
    fn non_executable_file_is_launch_error() {
      let stubs = StubDir::new();
      let path = stubs.path().join("plain");
      std::fs::write(&path, "echo 1 2\n").unwrap();

      let target = ExecutableTarget::new(path);
      assert!(matches!(run(&target, "HHHP"), Err(RunError::Launch { .. })));
    }

    #[test]
    #[serial]
    fn invalid_utf8_is_decode_error() {
      let stubs = StubDir::new();
      let target = stubs.script("binary", r"printf '\377\376 1\n'");

      assert!(matches!(run(&target, "HHHP"), Err(RunError::Decode(_))));
    }

    #[test]
    #[serial]
    fn non_zero_exit_is_not_an_error() {
      let stubs = StubDir::new();
      let target = stubs.script("failing", "echo 4 0.1; exit 3");

      let result = run(&target, "HHHP").unwrap();
      assert_eq!(result.score, "4");
    }

    #[test]
    #[serial]
    fn stderr_is_ignored() {
      let stubs = StubDir::new();
      let target = stubs.script("noisy", "echo progress >&2; echo 4 0.1");

      assert_eq!(run(&target, "HHHP").unwrap().duration, "0.1");
    }

    #[test]
    #[serial]
    fn timeout_kills_hung_child() {
      let stubs = StubDir::new();
      let target = stubs.script("hang", "exec sleep 30");

      let err = run_timeout(&target, "HHHP", Duration::from_millis(200)).unwrap_err();
      assert!(matches!(err, RunError::Timeout { .. }));
      assert_eq!(err.label(), "timeout");
    }

    #[test]
    #[serial]
    fn timeout_variant_parses_fast_child() {
      let stubs = StubDir::new();
      let target = stubs.script("fold", "echo 6 0.0123");

      let result = run_with(&target, "HPHPHP", Some(Duration::from_secs(10))).unwrap();
      assert_eq!(result.score, "6");
    }

    #[test]
    #[serial]
    fn timeout_variant_drains_output_larger_than_pipe() {
      let stubs = StubDir::new();
      let target = stubs.script(
        "chatty",
        r#"i=0; while [ "$i" -lt 20000 ]; do echo "score: 1234567"; i=$((i + 1)); done"#,
      );

      let unbounded = run(&target, "HHHP");
      let bounded = run_timeout(&target, "HHHP", Duration::from_secs(30));

      assert!(matches!(unbounded, Err(RunError::Unpack { found: 40000 })));
      assert!(matches!(bounded, Err(RunError::Unpack { found: 40000 })), "{bounded:?}");
    }

    #[test]
    #[serial]
    fn timeout_bounds_stdout_held_open_by_grandchild() {
      let stubs = StubDir::new();
      let target = stubs.script("orphan", "sleep 5 & echo 6 0.1");

      let start = std::time::Instant::now();
      let result = run_timeout(&target, "HHHP", Duration::from_millis(500));

      assert!(matches!(result, Err(RunError::Timeout { .. })), "{result:?}");
      assert!(start.elapsed() < Duration::from_secs(4));
    }
  }
}
