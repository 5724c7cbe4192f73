// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

/// A single exposed port, e.g. `8080` or `53/udp`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ExposedPort {
  pub port: u16,
  pub protocol: String
}

/// A Dockerfile [`EXPOSE` instruction][expose].
///
/// [expose]: https://docs.docker.com/engine/reference/builder/#expose
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ExposeInstruction {
  pub span: Span,
  pub ports: Vec<ExposedPort>
}

impl ExposeInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<ExposeInstruction> {
    let argument = record.argument.trim();
    if argument.is_empty() {
      return Err(parse_error("EXPOSE requires at least one port", None));
    }

    let mut ports = Vec::new();
    for token in argument.split_whitespace() {
      let (port_str, protocol) = match token.split_once('/') {
        Some((p, proto)) => (p, proto.to_ascii_lowercase()),
        None => (token, "tcp".to_string())
      };

      let port = port_str.parse::<u16>().map_err(|_| {
        validation_error(format!("invalid EXPOSE port '{}'", token), None)
      })?;

      ports.push(ExposedPort { port, protocol });
    }

    Ok(ExposeInstruction { span: record.span, ports })
  }
}
