// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::image::ImageRef;
use crate::lint::{Lint, LintCode};
use crate::span::Span;

/// A Dockerfile [`FROM` instruction][from].
///
/// [from]: https://docs.docker.com/engine/reference/builder/#from
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FromInstruction {
  pub span: Span,
  /// The raw (possibly variable-containing) base image expression.
  pub image: String,
  /// `image`, parsed as an [`ImageRef`]. Only meaningful once `image` has
  /// been expanded; callers working with an unexpanded instruction should
  /// treat this as a best-effort hint.
  pub image_parsed: ImageRef,
  /// Index of this `FROM` among all `FROM`s in the file, assigned by the
  /// caller during stage partitioning.
  pub index: usize,
  pub alias: Option<String>,
  pub platform: Option<String>
}

impl FromInstruction {
  pub(crate) fn from_record(record: &Record, index: usize) -> Result<(FromInstruction, Vec<Lint>)> {
    let mut lints = Vec::new();
    let tokens: Vec<&str> = record.argument.split_whitespace().collect();

    let (image, alias) = match tokens.len() {
      1 => (tokens[0].to_string(), None),
      3 => {
        if !tokens[1].eq_ignore_ascii_case("as") {
          return Err(parse_error(
            format!("expected 'as' as the second token of FROM, found '{}'", tokens[1]),
            None
          ));
        }

        let keyword_upper = record.keyword.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(true);
        let as_upper = tokens[1].chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(true);
        if keyword_upper != as_upper {
          lints.push(Lint::new(
            LintCode::FromAsCasingMismatch,
            format!("'{}' and '{}' have inconsistent casing", record.keyword, tokens[1]),
            None
          ));
        }

        (tokens[0].to_string(), Some(tokens[2].to_string()))
      },
      0 => return Err(parse_error("FROM requires a base image", None)),
      _ => return Err(parse_error("FROM takes one or three arguments (IMAGE [AS ALIAS])", None))
    };

    if let Some(alias) = &alias {
      if alias.chars().any(|c| c.is_ascii_uppercase()) {
        lints.push(Lint::new(
          LintCode::StageNameCasing,
          format!("stage name '{}' should be lowercase", alias),
          None
        ));
      }
    }

    let platform = record.flag("platform").and_then(|f| f.value.clone());
    let image_parsed = ImageRef::parse(&image);

    Ok((FromInstruction {
      span: record.span,
      image, image_parsed, index, alias, platform
    }, lints))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;

  fn parse(src: &str) -> Result<(FromInstruction, Vec<Lint>)> {
    let records = parse_records(src).unwrap();
    FromInstruction::from_record(&records[0], 0)
  }

  #[test]
  fn from_no_alias() {
    let (from, lints) = parse("FROM alpine:3.10").unwrap();
    assert_eq!(from.image, "alpine:3.10");
    assert_eq!(from.alias, None);
    assert_eq!(from.image_parsed.tag.as_deref(), Some("3.10"));
    assert!(lints.is_empty());
  }

  #[test]
  fn from_with_alias() {
    let (from, _) = parse("FROM golang:1.20 AS build").unwrap();
    assert_eq!(from.alias.as_deref(), Some("build"));
  }

  #[test]
  fn from_with_platform() {
    let (from, _) = parse("FROM --platform=linux/arm64 alpine").unwrap();
    assert_eq!(from.platform.as_deref(), Some("linux/arm64"));
  }

  #[test]
  fn from_casing_mismatch() {
    let (_, lints) = parse("FROM alpine as build").unwrap();
    assert_eq!(lints.len(), 1);
    assert_eq!(lints[0].code, LintCode::FromAsCasingMismatch);
  }

  #[test]
  fn from_missing_alias_errors() {
    assert!(parse("FROM alpine:3.10 as").is_err());
  }

  #[test]
  fn from_uppercase_alias_lints() {
    let (_, lints) = parse("FROM alpine AS Build").unwrap();
    assert!(lints.iter().any(|l| l.code == LintCode::StageNameCasing));
  }
}
