//! Shell-script stand-ins for folding executables.

use std::{
  fs,
  os::unix::fs::PermissionsExt,
  path::Path,
};

use tempfile::TempDir;

use crate::config::ExecutableTarget;

pub struct StubDir {
  dir: TempDir,
}

impl StubDir {
  pub fn new() -> Self {
    Self {
      dir: TempDir::with_prefix("prototein-stub-").unwrap(),
    }
  }

  pub fn path(&self) -> &Path {
    self.dir.path()
  }

  /// Writes an executable `/bin/sh` script named `name` running `body`.
  pub fn script(&self, name: &str, body: &str) -> ExecutableTarget {
    let path = self.dir.path().join(name);

    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    ExecutableTarget::new(path)
  }
}
