// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

/// A Dockerfile [`MAINTAINER` instruction][maintainer].
///
/// Deprecated by Docker in favor of `LABEL maintainer=...`, but still
/// present in real-world Dockerfiles.
///
/// [maintainer]: https://docs.docker.com/engine/reference/builder/#maintainer-deprecated
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MaintainerInstruction {
  pub span: Span,
  pub name: String
}

impl MaintainerInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<MaintainerInstruction> {
    let name = record.argument.trim();
    if name.is_empty() {
      return Err(parse_error("MAINTAINER requires a name", None));
    }

    Ok(MaintainerInstruction { span: record.span, name: name.to_string() })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;

  #[test]
  fn maintainer_basic() {
    let record = &parse_records("MAINTAINER Jane Doe <jane@example.com>").unwrap()[0];
    let m = MaintainerInstruction::from_record(record).unwrap();
    assert_eq!(m.name, "Jane Doe <jane@example.com>");
  }

  #[test]
  fn maintainer_empty_rejected() {
    let record = &parse_records("MAINTAINER").unwrap()[0];
    assert!(MaintainerInstruction::from_record(record).is_err());
  }
}
