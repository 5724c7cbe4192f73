// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::lint::{Lint, LintCode};
use crate::span::Span;
use crate::util;

/// A single environment variable key/value pair.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EnvVar {
  pub name: String,
  pub value: String
}

/// A Dockerfile [`ENV` instruction][env].
///
/// A single `ENV` instruction may set many variables; the legacy
/// single-pair whitespace form (`ENV KEY value with spaces`) is accepted but
/// warned on.
///
/// [env]: https://docs.docker.com/engine/reference/builder/#env
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EnvInstruction {
  pub span: Span,
  pub vars: Vec<EnvVar>
}

impl EnvInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<(EnvInstruction, Vec<Lint>)> {
    let argument = record.argument.trim();
    if argument.is_empty() {
      return Err(parse_error("ENV requires at least one variable", None));
    }

    let mut lints = Vec::new();
    let tokens = util::split_respecting_quotes(argument);

    let vars = if tokens.len() >= 1 && tokens[0].contains('=') {
      let mut vars = Vec::with_capacity(tokens.len());
      for token in &tokens {
        let (name, value) = util::split_kv_token(token)?;
        vars.push(EnvVar { name, value });
      }
      vars
    } else {
      lints.push(Lint::new(
        LintCode::LegacyKeyValueForm,
        "legacy whitespace ENV form, use ENV KEY=VALUE instead",
        None
      ));

      let name = tokens[0].clone();
      let value = argument[tokens[0].len()..].trim_start().to_string();
      vec![EnvVar { name, value }]
    };

    Ok((EnvInstruction { span: record.span, vars }, lints))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;

  fn parse(src: &str) -> Result<(EnvInstruction, Vec<Lint>)> {
    EnvInstruction::from_record(&parse_records(src).unwrap()[0])
  }

  #[test]
  fn env_single_pair() {
    let (env, lints) = parse("ENV foo=bar").unwrap();
    assert_eq!(env.vars, vec![EnvVar { name: "foo".into(), value: "bar".into() }]);
    assert!(lints.is_empty());
  }

  #[test]
  fn env_quoted_value() {
    let (env, _) = parse(r#"ENV FOO_BAR="baz qux""#).unwrap();
    assert_eq!(env.vars, vec![EnvVar { name: "FOO_BAR".into(), value: "baz qux".into() }]);
  }

  #[test]
  fn env_multiple_pairs() {
    let (env, _) = parse(r#"ENV foo="123" bar='456' baz=789"#).unwrap();
    assert_eq!(env.vars, vec![
      EnvVar { name: "foo".into(), value: "123".into() },
      EnvVar { name: "bar".into(), value: "456".into() },
      EnvVar { name: "baz".into(), value: "789".into() }
    ]);
  }

  #[test]
  fn env_legacy_form_warns() {
    let (env, lints) = parse("ENV foo bar baz").unwrap();
    assert_eq!(env.vars, vec![EnvVar { name: "foo".into(), value: "bar baz".into() }]);
    assert_eq!(lints.len(), 1);
    assert_eq!(lints[0].code, LintCode::LegacyKeyValueForm);
  }

  #[test]
  fn env_empty_rejected() {
    assert!(parse("ENV").is_err());
  }
}
