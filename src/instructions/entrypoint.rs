// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

use super::exec_form::ExecForm;

/// A Dockerfile [`ENTRYPOINT` instruction][entrypoint].
///
/// [entrypoint]: https://docs.docker.com/engine/reference/builder/#entrypoint
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EntrypointInstruction {
  pub span: Span,
  pub form: ExecForm
}

impl EntrypointInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<EntrypointInstruction> {
    Ok(EntrypointInstruction { span: record.span, form: ExecForm::from_record(record, "ENTRYPOINT")? })
  }

  pub fn shell<S: Into<String>>(s: S) -> EntrypointInstruction {
    EntrypointInstruction { span: Span::default(), form: ExecForm::shell(s) }
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> EntrypointInstruction {
    EntrypointInstruction { span: Span::default(), form: ExecForm::exec(args) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;

  fn parse(src: &str) -> Result<EntrypointInstruction> {
    EntrypointInstruction::from_record(&parse_records(src).unwrap()[0])
  }

  #[test]
  fn entrypoint_shell_form() {
    let e = parse(r#"ENTRYPOINT echo "hello world""#).unwrap();
    assert_eq!(e.form, ExecForm::shell(r#"echo "hello world""#));
  }

  #[test]
  fn entrypoint_exec_form() {
    let e = parse(r#"ENTRYPOINT ["echo", "hello world"]"#).unwrap();
    assert_eq!(e.form, ExecForm::exec(vec!["echo", "hello world"]));
  }
}
