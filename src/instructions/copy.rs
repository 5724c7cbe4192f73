// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

use super::flags::{split_paths, CopyFlags};

/// A Dockerfile [`COPY` instruction][copy].
///
/// [copy]: https://docs.docker.com/engine/reference/builder/#copy
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CopyInstruction {
  pub span: Span,
  pub common: CopyFlags,
  pub from: Option<String>,
  pub parents: bool,
  pub sources: Vec<String>,
  pub destination: String
}

impl CopyInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<CopyInstruction> {
    let (sources, destination) = split_paths(&record.argument)?;
    let common = CopyFlags::from_record(record);
    let from = record.flag("from").and_then(|f| f.value.clone());
    let parents = record.flag("parents").map(|f| f.value.as_deref() != Some("false")).unwrap_or(false);

    Ok(CopyInstruction { span: record.span, common, from, parents, sources, destination })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;

  fn parse(src: &str) -> Result<CopyInstruction> {
    CopyInstruction::from_record(&parse_records(src).unwrap()[0])
  }

  #[test]
  fn copy_basic() {
    let copy = parse("COPY foo bar").unwrap();
    assert_eq!(copy.sources, vec!["foo".to_string()]);
    assert_eq!(copy.destination, "bar");
  }

  #[test]
  fn copy_multiple_sources() {
    let copy = parse("COPY foo bar baz qux").unwrap();
    assert_eq!(copy.sources, vec!["foo".to_string(), "bar".to_string(), "baz".to_string()]);
    assert_eq!(copy.destination, "qux");
  }

  #[test]
  fn copy_requires_destination() {
    assert!(parse("COPY foo").is_err());
  }

  #[test]
  fn copy_flags() {
    let copy = parse("COPY --from=build --chown=1000:1000 /usr/lib/libssl.so.1.1 /tmp/").unwrap();
    assert_eq!(copy.from.as_deref(), Some("build"));
    assert_eq!(copy.common.chown.as_deref(), Some("1000:1000"));
    assert_eq!(copy.sources, vec!["/usr/lib/libssl.so.1.1".to_string()]);
    assert_eq!(copy.destination, "/tmp/");
  }

  #[test]
  fn copy_link() {
    let copy = parse("COPY --link a b").unwrap();
    assert!(copy.common.link);
  }
}
