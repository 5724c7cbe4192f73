// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

/// A Dockerfile [`ONBUILD` instruction][onbuild].
///
/// The nested instruction is stored verbatim, not parsed: it is only ever
/// acted on by a downstream build that uses this image as its base, which
/// is out of scope for the current build.
///
/// [onbuild]: https://docs.docker.com/engine/reference/builder/#onbuild
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OnbuildInstruction {
  pub span: Span,
  pub trigger: String
}

impl OnbuildInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<OnbuildInstruction> {
    let trigger = record.argument.trim();
    if trigger.is_empty() {
      return Err(parse_error("ONBUILD requires a nested instruction", None));
    }

    if trigger.to_ascii_uppercase().starts_with("ONBUILD") {
      return Err(parse_error("ONBUILD cannot nest ONBUILD", None));
    }

    Ok(OnbuildInstruction { span: record.span, trigger: trigger.to_string() })
  }
}
