// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

/// A Dockerfile [`WORKDIR` instruction][workdir].
///
/// [workdir]: https://docs.docker.com/engine/reference/builder/#workdir
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WorkdirInstruction {
  pub span: Span,
  pub path: String
}

impl WorkdirInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<WorkdirInstruction> {
    let path = record.argument.trim();
    if path.is_empty() {
      return Err(parse_error("WORKDIR requires a path", None));
    }

    Ok(WorkdirInstruction { span: record.span, path: path.to_string() })
  }
}
