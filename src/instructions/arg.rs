// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;
use crate::util::split_key_value;

/// A Dockerfile [`ARG` instruction][arg].
///
/// `ARG` may declare more than one name in a single instruction.
///
/// [arg]: https://docs.docker.com/engine/reference/builder/#arg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgInstruction {
  pub span: Span,
  pub vars: Vec<ArgVar>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgVar {
  pub name: String,
  pub value: Option<String>
}

impl ArgInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<ArgInstruction> {
    if record.argument.trim().is_empty() {
      return Err(parse_error("ARG requires at least one name", None));
    }

    let mut vars = Vec::new();
    for token in record.argument.split_whitespace() {
      let (name, value) = split_key_value(token)?;
      vars.push(ArgVar { name, value });
    }

    Ok(ArgInstruction { span: record.span, vars })
  }
}
