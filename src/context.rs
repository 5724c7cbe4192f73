// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// The local build context capability: `COPY`/`ADD`
// dispatch needs to resolve sources against *something*; this is the
// narrow trait a real context (tar stream, local directory, gitignore and
// dockerignore filtering) would implement. Remote context transports
// (git, tarball upload) remain out of scope.

use crate::error::Result;

/// A read-only view of the build context a stage's `COPY`/`ADD` sources
/// are resolved against.
pub trait BuildContext: Send + Sync {
  /// Lists context-relative paths under `prefix`, honoring
  /// `.dockerignore` exclusion. Paths are returned relative to the
  /// context root, using `/` separators.
  fn list(&self, prefix: &str) -> Result<Vec<String>>;

  /// Reads the full contents of a single context-relative path.
  fn read(&self, path: &str) -> Result<Vec<u8>>;
}

/// A trivial in-memory [`BuildContext`], sufficient to drive dispatch
/// end-to-end in tests without a real filesystem or tar stream.
#[derive(Debug, Clone, Default)]
pub struct MemoryContext {
  files: std::collections::BTreeMap<String, Vec<u8>>
}

impl MemoryContext {
  pub fn new() -> MemoryContext {
    MemoryContext::default()
  }

  pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> MemoryContext {
    self.files.insert(path.into(), content.into());
    self
  }
}

fn matches_dockerignore(path: &str, patterns: &[String]) -> bool {
  patterns.iter().any(|pat| {
    let pat = pat.trim();
    if pat.is_empty() || pat.starts_with('#') {
      return false;
    }
    path == pat || path.starts_with(&format!("{}/", pat))
  })
}

impl BuildContext for MemoryContext {
  fn list(&self, prefix: &str) -> Result<Vec<String>> {
    let ignore_patterns: Vec<String> = self.files.get(".dockerignore")
      .map(|bytes| String::from_utf8_lossy(bytes).lines().map(String::from).collect())
      .unwrap_or_default();

    let prefix = prefix.trim_start_matches("./");
    Ok(self.files.keys()
      .filter(|path| path.starts_with(prefix))
      .filter(|path| path.as_str() != ".dockerignore")
      .filter(|path| !matches_dockerignore(path, &ignore_patterns))
      .cloned()
      .collect())
  }

  fn read(&self, path: &str) -> Result<Vec<u8>> {
    let path = path.trim_start_matches("./");
    self.files.get(path).cloned().ok_or_else(|| crate::error::Error::ResolveError {
      message: format!("context path '{}' not found", path),
      location: None
    })
  }
}
