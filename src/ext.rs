use std::{
  io::{self, Read},
  path::Path,
  process::{Child, Command, ExitStatus, Output, Stdio},
  sync::mpsc::{self, RecvTimeoutError},
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, warn};
use wait_timeout::ChildExt as WaitExt;

#[extend::ext]
pub impl ExitStatus {
  /// Logs a non-zero exit. Targets are judged by their stdout alone, so this
  /// never fails.
  fn warn_unsuccessful(&self, program: &Path) {
    if self.success() {
      debug!("{program:?} exited with {self}");
    } else {
      warn!("{program:?} exited with non-zero status {self}");
    }
  }
}

#[extend::ext]
pub impl Child {
  /// Waits for the child and collects its stdout. Stdout is drained on a
  /// reader thread so a chatty child never stalls on a full pipe. If the child
  /// has not exited, or its stdout has not closed, within `timeout`, returns
  /// `Ok(None)`; a child still running is killed and reaped.
  fn wait_output_timeout(&mut self, timeout: Duration) -> io::Result<Option<Output>> {
    let start = Instant::now();
    let mut stdout = self
      .stdout
      .take()
      .ok_or_else(|| io::Error::other("child stdout was not piped"))?;

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
      let mut buf = Vec::new();
      let read = stdout.read_to_end(&mut buf).map(|_| buf);
      // receiver is gone if the wait already timed out
      let _ = tx.send(read);
    });

    let Some(status) = self.wait_timeout(timeout)? else {
      self.kill()?;
      self.wait()?;

      return Ok(None);
    };

    // A grandchild can keep stdout open after the child itself exits.
    match rx.recv_timeout(timeout.saturating_sub(start.elapsed())) {
      Ok(read) => Ok(Some(Output {
        status,
        stdout: read?,
        stderr: Vec::new(),
      })),
      Err(RecvTimeoutError::Timeout) => Ok(None),
      Err(RecvTimeoutError::Disconnected) => Err(io::Error::other("stdout reader exited without a result")),
    }
  }
}

#[extend::ext]
pub impl Command {
  /// Spawns the command with only stdout captured. Stderr goes to ours, stdin
  /// is closed.
  fn spawn_stdout(&mut self) -> io::Result<Child> {
    self
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .spawn()
  }
}
