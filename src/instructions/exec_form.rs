// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::util;

/// The shell-vs-exec duality shared by `RUN`, `CMD`, and `ENTRYPOINT`.
///
/// `Heredoc` is `RUN`'s third form (`RUN <<EOF\n...\nEOF`): the whole
/// instruction argument is empty and the command text is instead the
/// attached heredoc body. `expand` mirrors the heredoc's own marker
/// (`<<EOF` expands, `<<'EOF'`/`<<"EOF"` is literal) per `spec.md` §3/§4.B.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecForm {
  Shell(String),
  Exec(Vec<String>),
  Heredoc { body: String, expand: bool }
}

impl ExecForm {
  pub(crate) fn from_record(record: &Record, keyword: &str) -> Result<ExecForm> {
    let arg = record.argument.trim();

    if util::is_json_array(arg) {
      Ok(ExecForm::Exec(util::parse_json_string_array(arg)?))
    } else if arg.is_empty() {
      match record.heredocs.first() {
        Some(heredoc) => Ok(ExecForm::Heredoc { body: heredoc.body.clone(), expand: heredoc.expand }),
        None => Err(parse_error(format!("{} requires a command", keyword), None))
      }
    } else {
      Ok(ExecForm::Shell(arg.to_string()))
    }
  }

  pub fn shell<S: Into<String>>(s: S) -> ExecForm {
    ExecForm::Shell(s.into())
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> ExecForm {
    ExecForm::Exec(args.into_iter().map(|s| s.into()).collect())
  }
}
