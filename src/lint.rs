// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP
//
// The linter rule set itself is an external collaborator; this crate only ever *produces* lint data as a side effect of
// parsing/resolving/dispatching, it never decides whether a lint is fatal.
// `# check=skip=...;error=...` interpretation belongs to that external
// linter.

use crate::span::Location;

/// A stable identifier for one lint rule, named after the condition it
/// flags so a host linter can map it to a user-facing rule id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintCode {
  /// `from`/`as` keywords whose casing doesn't match the instruction's own.
  FromAsCasingMismatch,
  /// A stage alias whose casing doesn't match the surrounding instructions.
  StageNameCasing,
  /// A stage named `scratch` or `context`.
  ReservedStageName,
  /// `--platform` pinned to a literal constant instead of a build arg.
  ExplicitPlatform,
  /// `--platform=$TARGETPLATFORM`, which is already the default.
  RedundantTargetPlatform,
  /// A variable reference with no binding in scope.
  UndefinedVariable,
  /// The legacy whitespace `ENV K V` / `LABEL K V` form.
  LegacyKeyValueForm,
  /// `WORKDIR` given a relative path before any absolute workdir was set.
  RelativeWorkdir,
  /// A config-only instruction (`CMD`, `USER`, ...) repeated in one stage.
  DuplicateConfigInstruction
}

/// A single lint finding, surfaced as data rather than rendered.
#[derive(Debug, Clone)]
pub struct Lint {
  pub code: LintCode,
  pub message: String,
  pub location: Option<Location>
}

impl Lint {
  pub fn new(code: LintCode, message: impl Into<String>, location: Option<Location>) -> Lint {
    Lint { code, message: message.into(), location }
  }
}
