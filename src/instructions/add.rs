// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

use super::flags::{split_paths, CopyFlags};
use super::package::PackageInstruction;

/// A Dockerfile [`ADD` instruction][add].
///
/// [add]: https://docs.docker.com/engine/reference/builder/#add
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AddInstruction {
  pub span: Span,
  pub common: CopyFlags,
  pub checksum: Option<String>,
  pub keep_git_dir: bool,
  pub unpack: bool,
  pub sources: Vec<String>,
  pub destination: String
}

/// What a parsed `ADD` record resolves to: a plain `ADD`, or the `--apt`
/// specialization. When `--apt` is present, every other flag (including
/// `--link`) is ignored rather than validated.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AddOutcome {
  Add(AddInstruction),
  Package(PackageInstruction)
}

impl AddInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<AddOutcome> {
    let apt = record.flag("apt").map(|f| f.value.as_deref() != Some("false")).unwrap_or(false);
    if apt {
      return Ok(AddOutcome::Package(PackageInstruction::from_record(record)?));
    }

    let (sources, destination) = split_paths(&record.argument)?;
    let common = CopyFlags::from_record(record);
    let checksum = record.flag("checksum").and_then(|f| f.value.clone());
    let keep_git_dir = record.flag("keep-git-dir").map(|f| f.value.as_deref() != Some("false")).unwrap_or(false);
    let unpack = record.flag("unpack").map(|f| f.value.as_deref() != Some("false")).unwrap_or(false);

    Ok(AddOutcome::Add(AddInstruction {
      span: record.span, common, checksum, keep_git_dir, unpack, sources, destination
    }))
  }
}
