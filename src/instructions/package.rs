// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

/// The `--apt` specialization of `ADD`.
///
/// Per the open questions this crate resolves in `DESIGN.md`: every flag
/// other than `--apt` itself (including `--link`) is silently ignored, not
/// rejected, matching the upstream behavior this instruction preserves.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PackageInstruction {
  pub span: Span,
  pub packages: Vec<String>
}

impl PackageInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<PackageInstruction> {
    let packages: Vec<String> = record.argument.split_whitespace().map(String::from).collect();

    if packages.is_empty() {
      return Err(parse_error("ADD --apt requires at least one package name", None));
    }

    Ok(PackageInstruction { span: record.span, packages })
  }
}
