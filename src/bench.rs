use std::time::Duration;

use tracing::{info, warn};

use crate::{
  config::{Config, ExecutableTarget},
  run::{self, RunError, RunResult},
};

/// Outcomes of one target over every case, in case order.
pub struct TargetRuns {
  pub target: ExecutableTarget,
  pub runs: Vec<Result<RunResult, RunError>>,
}

pub struct Bench<'a> {
  config: &'a Config,
  /// Per-run wait limit. `None` waits forever.
  timeout: Option<Duration>,
  /// Results collected for each target, in target order.
  pub results: Vec<TargetRuns>,
}

impl<'a> Bench<'a> {
  pub fn new(config: &'a Config, timeout: Option<Duration>) -> Self {
    Self {
      config,
      timeout,
      results: Vec::new(),
    }
  }

  /// Runs every target over every case, one child at a time. A failed run is
  /// recorded and the bench moves on.
  pub fn bench(&mut self) {
    for target in self.config.targets() {
      let runs = self.bench_target(target);

      self.results.push(TargetRuns {
        target: target.clone(),
        runs,
      });
    }
  }

  fn bench_target(&self, target: &ExecutableTarget) -> Vec<Result<RunResult, RunError>> {
    info!("benchmarking {target}");

    self
      .config
      .cases()
      .iter()
      .map(|case| {
        info!("  running {:?}", case.sequence);

        let result = run::run_with(target, &case.sequence, self.timeout);
        if let Err(err) = &result {
          warn!("{target} {:?}: {err}", case.sequence);
        }

        result
      })
      .collect()
  }
}
