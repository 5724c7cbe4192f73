// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

/// A Dockerfile [`STOPSIGNAL` instruction][stopsignal].
///
/// [stopsignal]: https://docs.docker.com/engine/reference/builder/#stopsignal
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StopsignalInstruction {
  pub span: Span,
  pub signal: String
}

impl StopsignalInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<StopsignalInstruction> {
    let signal = record.argument.trim();
    if signal.is_empty() {
      return Err(parse_error("STOPSIGNAL requires a signal", None));
    }

    Ok(StopsignalInstruction { span: record.span, signal: signal.to_string() })
  }
}
