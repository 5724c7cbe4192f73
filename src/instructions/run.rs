// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::collections::BTreeMap;

use crate::ast::Record;
use crate::error::*;
use crate::mount::Mount;
use crate::span::Span;

use super::exec_form::ExecForm;

/// A Dockerfile [`RUN` instruction][run].
///
/// The `--network`/`--security`/`--device` flags are an open-ended hook
/// chain: anything besides `--mount` is stored verbatim in `hooks` and
/// interpreted by the dispatcher only if the relevant feature is enabled in
/// the build options.
///
/// [run]: https://docs.docker.com/engine/reference/builder/#run
#[derive(Debug, PartialEq, Clone)]
pub struct RunInstruction {
  pub span: Span,
  pub form: ExecForm,
  pub mounts: Vec<Mount>,
  pub network: Option<String>,
  pub security: Option<String>,
  pub hooks: BTreeMap<String, Option<String>>
}

impl RunInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<RunInstruction> {
    let mut mounts = Vec::new();
    let mut network = None;
    let mut security = None;
    let mut hooks = BTreeMap::new();

    for flag in &record.flags {
      match flag.name.as_str() {
        "mount" => mounts.push(Mount::parse(flag.value.as_deref().unwrap_or(""))?),
        "network" => network = flag.value.clone(),
        "security" => security = flag.value.clone(),
        other => { hooks.insert(other.to_string(), flag.value.clone()); }
      }
    }

    Ok(RunInstruction {
      span: record.span,
      form: ExecForm::from_record(record, "RUN")?,
      mounts, network, security, hooks
    })
  }

  pub fn shell<S: Into<String>>(s: S) -> RunInstruction {
    RunInstruction {
      span: Span::default(), form: ExecForm::shell(s),
      mounts: Vec::new(), network: None, security: None, hooks: BTreeMap::new()
    }
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> RunInstruction {
    RunInstruction {
      span: Span::default(), form: ExecForm::exec(args),
      mounts: Vec::new(), network: None, security: None, hooks: BTreeMap::new()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;
  use crate::mount::CacheSharing;

  fn parse(src: &str) -> Result<RunInstruction> {
    RunInstruction::from_record(&parse_records(src).unwrap()[0])
  }

  #[test]
  fn run_shell_form() {
    let run = parse(r#"RUN echo "hello world""#).unwrap();
    assert_eq!(run.form, ExecForm::shell(r#"echo "hello world""#));
  }

  #[test]
  fn run_exec_form() {
    let run = parse(r#"RUN ["echo", "hello world"]"#).unwrap();
    assert_eq!(run.form, ExecForm::exec(vec!["echo", "hello world"]));
  }

  #[test]
  fn run_with_cache_mount() {
    let run = parse("RUN --mount=type=cache,target=/var/cache/apt,id=apt,sharing=locked apt-get update").unwrap();
    assert_eq!(run.mounts.len(), 1);
    assert_eq!(run.mounts[0], Mount::Cache {
      id: "apt".into(), target: "/var/cache/apt".into(), sharing: CacheSharing::Locked
    });
  }

  #[test]
  fn run_with_network_and_unknown_hook() {
    let run = parse("RUN --network=none --device=nvidia.com/gpu=all echo hi").unwrap();
    assert_eq!(run.network.as_deref(), Some("none"));
    assert_eq!(run.hooks.get("device").cloned().flatten().as_deref(), Some("nvidia.com/gpu=all"));
  }
}
