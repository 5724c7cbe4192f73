// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;
use crate::util;

/// A Dockerfile [`VOLUME` instruction][volume].
///
/// Accepts either the JSON array form or a whitespace-separated list of
/// paths.
///
/// [volume]: https://docs.docker.com/engine/reference/builder/#volume
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VolumeInstruction {
  pub span: Span,
  pub paths: Vec<String>
}

impl VolumeInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<VolumeInstruction> {
    let argument = record.argument.trim();
    if argument.is_empty() {
      return Err(parse_error("VOLUME requires at least one path", None));
    }

    let paths = if util::is_json_array(argument) {
      util::parse_json_string_array(argument)?
    } else {
      argument.split_whitespace().map(String::from).collect()
    };

    Ok(VolumeInstruction { span: record.span, paths })
  }
}
