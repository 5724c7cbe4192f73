// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

use super::exec_form::ExecForm;

/// A Dockerfile [`CMD` instruction][cmd].
///
/// [cmd]: https://docs.docker.com/engine/reference/builder/#cmd
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CmdInstruction {
  pub span: Span,
  pub form: ExecForm
}

impl CmdInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<CmdInstruction> {
    Ok(CmdInstruction { span: record.span, form: ExecForm::from_record(record, "CMD")? })
  }

  pub fn shell<S: Into<String>>(s: S) -> CmdInstruction {
    CmdInstruction { span: Span::default(), form: ExecForm::shell(s) }
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> CmdInstruction {
    CmdInstruction { span: Span::default(), form: ExecForm::exec(args) }
  }
}
