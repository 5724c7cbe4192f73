// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;
use crate::util;

/// A single label key/value pair.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Label {
  pub name: String,
  pub value: String
}

impl Label {
  pub fn new<S: Into<String>>(name: S, value: S) -> Label {
    Label { name: name.into(), value: value.into() }
  }
}

/// A Dockerfile [`LABEL` instruction][label].
///
/// A single `LABEL` instruction may set many labels.
///
/// [label]: https://docs.docker.com/engine/reference/builder/#label
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LabelInstruction {
  pub span: Span,
  pub labels: Vec<Label>
}

impl LabelInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<LabelInstruction> {
    let argument = record.argument.trim();
    if argument.is_empty() {
      return Err(parse_error("LABEL requires at least one key=value pair", None));
    }

    let mut labels = Vec::new();
    for token in util::split_respecting_quotes(argument) {
      let (name, value) = util::split_kv_token(&token)?;
      labels.push(Label { name, value });
    }

    Ok(LabelInstruction { span: record.span, labels })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;

  fn parse(src: &str) -> Result<LabelInstruction> {
    LabelInstruction::from_record(&parse_records(src).unwrap()[0])
  }

  #[test]
  fn label_basic() {
    let label = parse("LABEL foo=bar").unwrap();
    assert_eq!(label.labels, vec![Label::new("foo", "bar")]);
  }

  #[test]
  fn label_quoted_name_and_value() {
    let label = parse(r#"LABEL "foo.bar"="baz qux""#).unwrap();
    assert_eq!(label.labels, vec![Label::new("foo.bar", "baz qux")]);
  }

  #[test]
  fn label_multi() {
    let label = parse(r#"LABEL foo=bar baz="qux" "quux quuz"="corge grault""#).unwrap();
    assert_eq!(label.labels, vec![
      Label::new("foo", "bar"),
      Label::new("baz", "qux"),
      Label::new("quux quuz", "corge grault")
    ]);
  }

  #[test]
  fn label_empty_rejected() {
    assert!(parse("LABEL").is_err());
  }
}
