use std::{
  collections::HashSet,
  env::consts::EXE_SUFFIX,
  fmt, fs, io,
  path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Directory the target executables are resolved in, relative to the working
/// directory.
pub const EXECUTABLES_DIR: &str = "./Executables";

const DEFAULT_TARGETS: [&str; 3] = [
  "Optimized_Parallel_Prototein",
  "Optimized_Sequential_Prototein",
  "Parallel_Prototein_no_output",
];

/// Reference fold scores, in reporting order.
const DEFAULT_CASES: [(&str, u32); 17] = [
  ("HHHP", 4),
  ("PHHHP", 4),
  ("HPHPPH", 4),
  ("HPHHPHP", 6),
  ("PHHPPHPH", 6),
  ("PPHHPPHPH", 6),
  ("HHPPPPHHHP", 10),
  ("HPHHHPHPPHP", 12),
  ("HPHHHPHHPPPH", 14),
  ("PHHHPPPHPHHPP", 12),
  ("PHHPHHPHPPHHHH", 22),
  ("HHPPHPHPPPHHPHH", 16),
  ("PHPPPPPPHHPHPPHP", 10),
  ("PHHPHHPPPPHHHPHPP", 18),
  ("HPHHHPPHPHPPHHHPHH", 26),
  ("HHPPPHPPPPPPHHPHHHP", 18),
  ("PHPPHHHPHHPPHPPPPPPH", 18),
];

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path:?}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config")]
  Parse(#[from] toml::de::Error),

  #[error("no {0} configured")]
  Empty(&'static str),

  #[error("{0:?} is not a non-empty sequence over H and P")]
  InvalidSequence(String),

  #[error("expected score for {0:?} must be positive")]
  InvalidScore(String),

  #[error("sequence {0:?} is listed more than once")]
  DuplicateSequence(String),

  #[error("target names must be non-empty")]
  EmptyTargetName,
}

/// One benchmark input and the score a correct folder should report for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkCase {
  pub sequence: String,
  pub expected_score: u32,
}

/// An external executable under benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableTarget {
  path: PathBuf,
}

impl ExecutableTarget {
  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// File name of the executable, used as its column label.
  pub fn name(&self) -> String {
    self
      .path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.path.display().to_string())
  }
}

impl fmt::Display for ExecutableTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path.display())
  }
}

/// Benchmark cases and targets. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
  executables_dir: PathBuf,
  targets: Vec<ExecutableTarget>,
  cases: Vec<BenchmarkCase>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialConfig {
  executables_dir: Option<PathBuf>,
  targets: Option<Vec<String>>,
  cases: Option<Vec<PartialCase>>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialCase {
  sequence: String,
  expected_score: u32,
}

impl Default for Config {
  fn default() -> Self {
    let executables_dir = PathBuf::from(EXECUTABLES_DIR);

    let targets = DEFAULT_TARGETS
      .iter()
      .map(|name| ExecutableTarget::new(executables_dir.join(format!("{name}{EXE_SUFFIX}"))))
      .collect();

    let cases = DEFAULT_CASES
      .iter()
      .map(|&(sequence, expected_score)| BenchmarkCase {
        sequence: sequence.to_string(),
        expected_score,
      })
      .collect();

    Self {
      executables_dir,
      targets,
      cases,
    }
  }
}

impl Config {
  /// Reads a TOML config file. Keys it leaves out keep their defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    debug!("loaded config from {path:?}");

    Self::from_toml(&contents)
  }

  pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
    let partial: PartialConfig = toml::from_str(contents)?;
    let mut config = Self::default();

    if let Some(dir) = partial.executables_dir {
      config.executables_dir = dir;
      // Default targets follow the directory unless they are overridden too.
      config.targets = DEFAULT_TARGETS
        .iter()
        .map(|name| config.target(&format!("{name}{EXE_SUFFIX}")))
        .collect();
    }

    if let Some(names) = partial.targets {
      if names.is_empty() {
        return Err(ConfigError::Empty("targets"));
      }

      config.targets = names
        .iter()
        .map(|name| {
          if name.trim().is_empty() {
            return Err(ConfigError::EmptyTargetName);
          }

          Ok(config.target(name))
        })
        .collect::<Result<_, _>>()?;
    }

    if let Some(cases) = partial.cases {
      config.cases = validate_cases(cases)?;
    }

    Ok(config)
  }

  pub fn cases(&self) -> &[BenchmarkCase] {
    &self.cases
  }

  pub fn targets(&self) -> &[ExecutableTarget] {
    &self.targets
  }

  /// Resolves a target name inside the executables directory.
  pub fn target(&self, name: &str) -> ExecutableTarget {
    ExecutableTarget::new(self.executables_dir.join(name))
  }
}

pub fn is_hp_sequence(sequence: &str) -> bool {
  !sequence.is_empty() && sequence.bytes().all(|b| b == b'H' || b == b'P')
}

fn validate_cases(cases: Vec<PartialCase>) -> Result<Vec<BenchmarkCase>, ConfigError> {
  if cases.is_empty() {
    return Err(ConfigError::Empty("cases"));
  }

  let mut seen = HashSet::new();

  cases
    .into_iter()
    .map(|PartialCase { sequence, expected_score }| {
      if !is_hp_sequence(&sequence) {
        return Err(ConfigError::InvalidSequence(sequence));
      }
      if expected_score == 0 {
        return Err(ConfigError::InvalidScore(sequence));
      }
      if !seen.insert(sequence.clone()) {
        return Err(ConfigError::DuplicateSequence(sequence));
      }

      Ok(BenchmarkCase {
        sequence,
        expected_score,
      })
    })
    .collect()
}
