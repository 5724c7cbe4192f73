// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP
//
// `COPY` and `ADD` share most of their flag grammar; this is the common
// subset both instruction modules parse out of an ast::Record's raw flags.

use crate::ast::Record;

/// Flags shared by `COPY` and `ADD`. Instruction-specific flags (`--from`,
/// `--parents` for `COPY`; `--checksum`, `--keep-git-dir`, `--unpack`,
/// `--apt` for `ADD`) are read directly by the owning module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyFlags {
  pub chown: Option<String>,
  pub chmod: Option<String>,
  pub link: bool,
  pub exclude: Vec<String>
}

impl CopyFlags {
  pub(crate) fn from_record(record: &Record) -> CopyFlags {
    let mut flags = CopyFlags::default();

    for flag in &record.flags {
      match flag.name.as_str() {
        "chown" => flags.chown = flag.value.clone(),
        "chmod" => flags.chmod = flag.value.clone(),
        "link" => flags.link = flag.value.as_deref().map(|v| v != "false").unwrap_or(true),
        "exclude" => if let Some(v) = &flag.value { flags.exclude.push(v.clone()); },
        _ => {}
      }
    }

    flags
  }
}

/// Splits a `COPY`/`ADD` argument tail into `(sources, destination)`,
/// requiring at least one source and exactly one destination.
pub(crate) fn split_paths(argument: &str) -> crate::error::Result<(Vec<String>, String)> {
  let mut paths: Vec<String> = argument.split_whitespace().map(String::from).collect();

  if paths.len() < 2 {
    return Err(crate::error::parse_error(
      "copy/add requires at least one source and a destination", None
    ));
  }

  let destination = paths.pop().unwrap();
  Ok((paths, destination))
}
