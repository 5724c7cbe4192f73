// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::fmt;

/// A byte-index tuple representing a span of characters in the source.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Span {
  pub start: usize,
  pub end: usize
}

impl Span {
  pub fn new(start: usize, end: usize) -> Span {
    Span { start, end }
  }

  /// Computes the 1-indexed (line, column) of `start` within `content`.
  pub fn line_col(&self, content: &str) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for ch in content.chars().take(self.start) {
      if ch == '\n' {
        line += 1;
        col = 1;
      } else {
        col += 1;
      }
    }

    (line, col)
  }
}

/// A fully-resolved source location: an optional file name, a line/column
/// pair, and the underlying byte span.
///
/// This is attached to errors and to [`crate::instruction::Instruction`]s so
/// a host (IDE, linter) can underline the offending text.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Location {
  pub file: Option<String>,
  pub line: usize,
  pub column: usize,
  pub span: Span
}

impl Location {
  pub fn new(file: Option<String>, content: &str, span: Span) -> Location {
    let (line, column) = span.line_col(content);
    Location { file, line, column, span }
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.file {
      Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
      None => write!(f, "{}:{}", self.line, self.column)
    }
  }
}
