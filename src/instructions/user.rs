// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

/// A Dockerfile [`USER` instruction][user].
///
/// [user]: https://docs.docker.com/engine/reference/builder/#user
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserInstruction {
  pub span: Span,
  pub user: String,
  pub group: Option<String>
}

impl UserInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<UserInstruction> {
    let argument = record.argument.trim();
    if argument.is_empty() {
      return Err(parse_error("USER requires a user name or uid", None));
    }

    let (user, group) = match argument.split_once(':') {
      Some((u, g)) => (u.to_string(), Some(g.to_string())),
      None => (argument.to_string(), None)
    };

    Ok(UserInstruction { span: record.span, user, group })
  }
}
