// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;
use crate::util;

/// A Dockerfile [`SHELL` instruction][shell].
///
/// Unlike `RUN`/`CMD`/`ENTRYPOINT`, `SHELL` requires the JSON array form;
/// the shell form is rejected outright.
///
/// [shell]: https://docs.docker.com/engine/reference/builder/#shell
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ShellInstruction {
  pub span: Span,
  pub shell: Vec<String>
}

impl ShellInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<ShellInstruction> {
    let argument = record.argument.trim();
    if !util::is_json_array(argument) {
      return Err(parse_error("SHELL requires the JSON array form", None));
    }

    let shell = util::parse_json_string_array(argument)?;
    if shell.is_empty() {
      return Err(parse_error("SHELL requires at least one element", None));
    }

    Ok(ShellInstruction { span: record.span, shell })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;

  fn parse(src: &str) -> Result<ShellInstruction> {
    ShellInstruction::from_record(&parse_records(src).unwrap()[0])
  }

  #[test]
  fn shell_json_form() {
    let s = parse(r#"SHELL ["/bin/bash", "-c"]"#).unwrap();
    assert_eq!(s.shell, vec!["/bin/bash".to_string(), "-c".to_string()]);
  }

  #[test]
  fn shell_non_json_rejected() {
    assert!(parse("SHELL /bin/bash -c").is_err());
  }
}
