// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// The dispatcher: walks one resolved stage's instructions in
// source order, threading a filesystem root handle, a variable [`Scope`],
// and an [`ImageConfig`] through each, and emits the corresponding graph
// nodes along the way.

use std::collections::BTreeMap;

use crate::apt;
use crate::config::{Healthcheck, ImageConfig};
use crate::context::BuildContext;
use crate::engine::BuildEngine;
use crate::error::{Error, Result};
use crate::expand::{expand, Scope};
use crate::graph::{FileEntry, Graph, NodeId, NodeKind, Source};
use crate::image::ImageRef;
use crate::instruction::Instruction;
use crate::instructions::{ExecForm, HealthcheckInstruction};
use crate::lint::{Lint, LintCode};
use crate::options::{BuildOptions, CancellationToken};
use crate::resolver::{Stage, StageBase, StageGraph};
use tracing::{debug, instrument, warn};

const DEFAULT_SHELL: [&str; 2] = ["/bin/sh", "-c"];

/// What dispatching one stage produces: the filesystem handle its
/// successors (and `COPY --from=`) should read, its image config, and any
/// lints accumulated while expanding its instructions.
pub struct DispatchOutput {
  pub root: NodeId,
  pub config: ImageConfig,
  pub lints: Vec<Lint>
}

struct DispatchState {
  root: NodeId,
  scope: Scope,
  config: ImageConfig,
  workdir: Option<String>,
  shell: Vec<String>,
  lints: Vec<Lint>,
  /// Which single-valued config instructions have already fired in this
  /// stage, so a second occurrence can warn per `spec.md` §4.D ("multiple
  /// of the same in one stage warn (only last survives)").
  seen_singleton: std::collections::BTreeSet<&'static str>
}

/// Records that `kind` just dispatched; if it already fired earlier in
/// this stage, pushes a [`LintCode::DuplicateConfigInstruction`] warning.
fn warn_if_repeated(state: &mut DispatchState, kind: &'static str) {
  if !state.seen_singleton.insert(kind) {
    state.lints.push(Lint::new(
      LintCode::DuplicateConfigInstruction,
      format!("{} is set more than once in this stage; only the last one takes effect", kind),
      None
    ));
  }
}

fn expand_str(value: &str, scope: &Scope, lints: &mut Vec<Lint>) -> Result<String> {
  let expansion = expand(value, scope)?;
  lints.extend(expansion.warnings);
  Ok(expansion.value)
}

fn exec_args(form: &ExecForm, shell: &[String], scope: &Scope, lints: &mut Vec<Lint>) -> Result<Vec<String>> {
  match form {
    ExecForm::Shell(s) => {
      let mut args = shell.to_vec();
      args.push(expand_str(s, scope, lints)?);
      Ok(args)
    },
    ExecForm::Exec(parts) => parts.iter().map(|p| expand_str(p, scope, lints)).collect(),
    ExecForm::Heredoc { body, expand: should_expand } => {
      let mut args = shell.to_vec();
      let script = if *should_expand { expand_str(body, scope, lints)? } else { body.clone() };
      args.push(script);
      Ok(args)
    }
  }
}

fn exec_form_text(form: &ExecForm) -> String {
  match form {
    ExecForm::Shell(s) => s.clone(),
    ExecForm::Exec(parts) => parts.join(" "),
    ExecForm::Heredoc { body, .. } => format!("<<EOF {}EOF", body)
  }
}

/// Reconstructs a `created_by` history label from an instruction's raw
/// (pre-expansion) fields, mirroring how Docker shows original source text
/// in image history rather than the expanded runtime values.
fn history_label(instruction: &Instruction) -> String {
  match instruction {
    Instruction::From(f) => match &f.alias {
      Some(alias) => format!("FROM {} AS {}", f.image, alias),
      None => format!("FROM {}", f.image)
    },
    Instruction::Arg(a) => format!(
      "ARG {}",
      a.vars.iter().map(|v| match &v.value {
        Some(val) => format!("{}={}", v.name, val),
        None => v.name.clone()
      }).collect::<Vec<_>>().join(" ")
    ),
    Instruction::Env(e) => format!(
      "ENV {}",
      e.vars.iter().map(|v| format!("{}={}", v.name, v.value)).collect::<Vec<_>>().join(" ")
    ),
    Instruction::Label(l) => format!(
      "LABEL {}",
      l.labels.iter().map(|l| format!("{}={}", l.name, l.value)).collect::<Vec<_>>().join(" ")
    ),
    Instruction::Maintainer(m) => format!("MAINTAINER {}", m.name),
    Instruction::Add(a) => format!("ADD {} {}", a.sources.join(" "), a.destination),
    Instruction::Copy(c) => format!("COPY {} {}", c.sources.join(" "), c.destination),
    Instruction::Package(p) => format!("ADD --apt {}", p.packages.join(" ")),
    Instruction::Run(r) => format!("RUN {}", exec_form_text(&r.form)),
    Instruction::Cmd(c) => format!("CMD {}", exec_form_text(&c.form)),
    Instruction::Entrypoint(e) => format!("ENTRYPOINT {}", exec_form_text(&e.form)),
    Instruction::Healthcheck(HealthcheckInstruction::None) => "HEALTHCHECK NONE".to_string(),
    Instruction::Healthcheck(HealthcheckInstruction::Cmd { test, .. }) => format!("HEALTHCHECK CMD {}", test),
    Instruction::Expose(e) => format!(
      "EXPOSE {}",
      e.ports.iter().map(|p| format!("{}/{}", p.port, p.protocol)).collect::<Vec<_>>().join(" ")
    ),
    Instruction::User(u) => match &u.group {
      Some(group) => format!("USER {}:{}", u.user, group),
      None => format!("USER {}", u.user)
    },
    Instruction::Volume(v) => format!("VOLUME {}", v.paths.join(" ")),
    Instruction::Workdir(w) => format!("WORKDIR {}", w.path),
    Instruction::Shell(s) => format!("SHELL {:?}", s.shell),
    Instruction::Onbuild(o) => format!("ONBUILD {}", o.trigger),
    Instruction::Stopsignal(s) => format!("STOPSIGNAL {}", s.signal)
  }
}

/// Joins a (possibly relative) `WORKDIR` path onto the previous workdir.
/// Returns the new absolute path and whether the input was itself relative.
fn join_workdir(current: &Option<String>, next: &str) -> (String, bool) {
  if next.starts_with('/') {
    (next.to_string(), false)
  } else {
    let base = current.clone().unwrap_or_else(|| "/".to_string());
    (format!("{}/{}", base.trim_end_matches('/'), next), true)
  }
}

/// What a `COPY --from=`/`ADD --from=` token resolves to.
enum FromRef {
  Stage(usize),
  Image(ImageRef)
}

/// Resolves a `COPY --from=`/`ADD --from=` reference against the stage
/// names defined so far. Mirrors [`crate::resolver::resolve_stage_ref`]:
/// a numeric token below the current stage's index is a stage index, a
/// name lookup only sees earlier stages. Anything that names neither is
/// treated as an image reference, mirroring `resolver::resolve`'s "unknown
/// name is an image reference" rule for `FROM`.
fn resolve_from_ref(raw: &str, stage_graph: &StageGraph, current_index: usize) -> FromRef {
  if let Ok(idx) = raw.parse::<usize>() {
    if idx < current_index {
      return FromRef::Stage(idx);
    }
  }

  let lower = raw.to_ascii_lowercase();
  let named = stage_graph.stages.iter()
    .take(current_index)
    .find(|s| s.name.as_deref() == Some(lower.as_str()))
    .map(|s| s.index);

  match named {
    Some(idx) => FromRef::Stage(idx),
    None => FromRef::Image(ImageRef::parse(raw))
  }
}

/// Builds a single `File` node copying `sources` into `destination`. When
/// `from` is `Some`, sources are read from that stage's final handle
/// instead of the local build context. When `link` is set, the copy is
/// built as a node independent of `base` (so it cache-hits regardless of
/// what changed upstream) and joined back on with a `Merge` node instead
/// of taking `base` as a delta input directly.
fn copy_sources(
  graph: &mut Graph,
  base: NodeId,
  sources: &[String],
  destination: &str,
  from: Option<NodeId>,
  chown: Option<String>,
  chmod: Option<String>,
  link: bool
) -> NodeId {
  let mut inputs = if link { Vec::new() } else { vec![base] };
  let mut entries = Vec::with_capacity(sources.len());
  let multiple = sources.len() > 1 || destination.ends_with('/');

  for src in sources {
    let input_id = from.unwrap_or_else(|| graph.push(NodeKind::Source(Source::Context { name: src.clone() })));
    let source_input = inputs.iter().position(|&id| id == input_id).unwrap_or_else(|| {
      inputs.push(input_id);
      inputs.len() - 1
    });

    let dest_path = if multiple {
      let basename = src.rsplit('/').next().unwrap_or(src);
      format!("{}{}{}", destination.trim_end_matches('/'), "/", basename)
    } else {
      destination.to_string()
    };

    entries.push(FileEntry {
      source_input,
      source_path: if from.is_some() { src.clone() } else { "/".to_string() },
      dest_path,
      chown: chown.clone(),
      chmod: chmod.clone(),
      mkdir: true
    });
  }

  let file = graph.push(NodeKind::File { inputs, entries });
  if link {
    graph.push(NodeKind::Merge { inputs: vec![base, file] })
  } else {
    file
  }
}

/// Checks that every literal (non-glob) local source actually exists in
/// the build context, so a missing file is a located [`Error::ResolveError`]
/// at dispatch time rather than a mid-build surprise.
fn check_context_sources(context: &dyn BuildContext, sources: &[String]) -> Result<()> {
  for src in sources {
    if src.contains('*') || src.contains('?') {
      continue;
    }
    if context.list(src)?.is_empty() {
      return Err(Error::ResolveError {
        message: format!("context path '{}' not found", src),
        location: None
      });
    }
  }
  Ok(())
}

fn is_remote_url(src: &str) -> bool {
  src.starts_with("http://") || src.starts_with("https://")
}

fn is_git_url(src: &str) -> bool {
  src.starts_with("git://") || src.starts_with("git@") || src.ends_with(".git")
}

/// Builds the `File` node for an `ADD`, which (unlike `COPY`) may pull
/// from a remote URL or a git repository instead of the local context.
fn add_sources(
  graph: &mut Graph,
  base: NodeId,
  add: &crate::instructions::AddInstruction,
  checksum: Option<String>,
  chown: Option<String>,
  chmod: Option<String>,
  link: bool
) -> NodeId {
  let mut inputs = if link { Vec::new() } else { vec![base] };
  let mut entries = Vec::with_capacity(add.sources.len());
  let multiple = add.sources.len() > 1 || add.destination.ends_with('/');

  for src in &add.sources {
    let source = if is_git_url(src) {
      Source::Git { url: src.clone(), reference: None, keep_git_dir: add.keep_git_dir }
    } else if is_remote_url(src) {
      let filename = src.rsplit('/').next().filter(|s| !s.is_empty()).map(String::from);
      Source::Http { url: src.clone(), filename, checksum: checksum.clone() }
    } else {
      Source::Context { name: src.clone() }
    };

    inputs.push(graph.push(NodeKind::Source(source)));
    let source_input = inputs.len() - 1;

    let dest_path = if multiple {
      let basename = src.rsplit('/').next().unwrap_or(src);
      format!("{}/{}", add.destination.trim_end_matches('/'), basename)
    } else {
      add.destination.clone()
    };

    entries.push(FileEntry {
      source_input,
      source_path: "/".to_string(),
      dest_path,
      chown: chown.clone(),
      chmod: chmod.clone(),
      mkdir: true
    });
  }

  let file = graph.push(NodeKind::File { inputs, entries });
  if link {
    graph.push(NodeKind::Merge { inputs: vec![base, file] })
  } else {
    file
  }
}

/// Dispatches one resolved stage. `stage_outputs` carries the
/// final root handle of every earlier stage, keyed by its index, so `FROM`
/// and `COPY --from=` can reference them instead of re-deriving state.
#[instrument(level = "debug", skip_all, fields(stage = stage.index, name = stage.name.as_deref().unwrap_or("")))]
pub async fn dispatch_stage<'a>(
  graph: &mut Graph,
  stage_graph: &StageGraph<'a>,
  stage: &Stage<'a>,
  stage_outputs: &BTreeMap<usize, NodeId>,
  context: &dyn BuildContext,
  engine: &dyn BuildEngine,
  options: &BuildOptions,
  cancel: &CancellationToken
) -> Result<DispatchOutput> {
  let base = match &stage.base {
    StageBase::Scratch => graph.push(NodeKind::Source(Source::Scratch)),
    StageBase::Stage(idx) => *stage_outputs.get(idx).expect("ancestor stage dispatched before its dependents"),
    StageBase::Image(image_ref) => graph.push(NodeKind::Source(Source::Image {
      reference: image_ref.to_string(),
      platform: Some(stage.platform.clone())
    }))
  };

  // Only the predefined platform args are automatically visible inside a
  // stage's own instructions; every other global ARG requires the stage to
  // redeclare it with a bare `ARG NAME` (handled below, which reads
  // `stage_graph.global_args` directly) before it enters `stage_args`. This
  // is what `spec.md` §4.C step 2 means by "only args explicitly consumed
  // by the stage... are visible" — the `FROM` line itself is the one place
  // that already saw the full global ARG env, in `resolver::resolve`.
  let mut scope = Scope::default();
  scope.global_args.insert("BUILDPLATFORM".to_string(), Some(options.build_platform.to_string()));
  scope.global_args.insert("TARGETPLATFORM".to_string(), Some(options.target_platform.to_string()));
  scope.global_args.insert("TARGETOS".to_string(), Some(stage.platform.os.clone()));
  scope.global_args.insert("TARGETARCH".to_string(), Some(stage.platform.arch.clone()));

  let mut state = DispatchState {
    root: base,
    scope,
    config: ImageConfig::new(),
    workdir: None,
    shell: DEFAULT_SHELL.iter().map(|s| s.to_string()).collect(),
    lints: Vec::new(),
    seen_singleton: std::collections::BTreeSet::new()
  };

  debug!(instructions = stage.instructions.len(), "dispatching stage");

  for instruction in &stage.instructions {
    if cancel.is_cancelled() {
      warn!("build cancelled mid-stage");
      return Err(Error::Cancelled);
    }

    dispatch_one(graph, stage_graph, stage, stage_outputs, instruction, context, engine, options, cancel, &mut state).await?;
  }

  Ok(DispatchOutput { root: state.root, config: state.config, lints: state.lints })
}

async fn dispatch_one<'a>(
  graph: &mut Graph,
  stage_graph: &StageGraph<'a>,
  stage: &Stage<'a>,
  stage_outputs: &BTreeMap<usize, NodeId>,
  instruction: &Instruction,
  context: &dyn BuildContext,
  engine: &dyn BuildEngine,
  options: &BuildOptions,
  cancel: &CancellationToken,
  state: &mut DispatchState
) -> Result<()> {
  let label = history_label(instruction);
  debug!(%label, "dispatching instruction");

  match instruction {
    Instruction::From(_) => {},

    Instruction::Arg(arg) => {
      for var in &arg.vars {
        let default = match &var.value {
          Some(raw) => Some(expand_str(raw, &state.scope, &mut state.lints)?),
          None => None
        };
        let value = options.build_args.get(&var.name).cloned()
          .or(default)
          .or_else(|| stage_graph.global_args.get(&var.name).cloned().flatten());
        state.scope.stage_args.insert(var.name.clone(), value);
      }
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Env(env) => {
      for var in &env.vars {
        let value = expand_str(&var.value, &state.scope, &mut state.lints)?;
        state.scope = state.scope.with_env(var.name.clone(), value.clone());
        state.config.env.insert(var.name.clone(), value);
      }
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Label(l) => {
      for entry in &l.labels {
        let value = expand_str(&entry.value, &state.scope, &mut state.lints)?;
        state.config.labels.insert(entry.name.clone(), value);
      }
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Maintainer(m) => {
      state.config.labels.insert("maintainer".to_string(), m.name.clone());
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Add(add) => {
      let chown = match &add.common.chown {
        Some(v) => Some(expand_str(v, &state.scope, &mut state.lints)?),
        None => None
      };

      let local: Vec<String> = add.sources.iter()
        .filter(|s| !is_remote_url(s) && !is_git_url(s))
        .cloned()
        .collect();
      check_context_sources(context, &local)?;

      state.root = add_sources(graph, state.root, add, add.checksum.clone(), chown, add.common.chmod.clone(), add.common.link);
      state.config.record_history(label, false, options.source_date_epoch);
    },

    Instruction::Copy(copy) => {
      let from_root = match &copy.from {
        Some(raw) => {
          let root = match resolve_from_ref(raw, stage_graph, stage.index) {
            // The referenced stage must already have been dispatched; the
            // caller (lib.rs's scheduler) guarantees topological order.
            FromRef::Stage(idx) => *stage_outputs.get(&idx).expect("ancestor stage dispatched before its dependents"),
            FromRef::Image(image_ref) => graph.push(NodeKind::Source(Source::Image {
              reference: image_ref.to_string(),
              platform: Some(stage.platform.clone())
            }))
          };
          Some(root)
        },
        None => {
          check_context_sources(context, &copy.sources)?;
          None
        }
      };

      let chown = match &copy.common.chown {
        Some(v) => Some(expand_str(v, &state.scope, &mut state.lints)?),
        None => None
      };

      state.root = copy_sources(
        graph, state.root, &copy.sources, &copy.destination, from_root, chown, copy.common.chmod.clone(), copy.common.link
      );
      state.config.record_history(label, false, options.source_date_epoch);
    },

    Instruction::Package(pkg) => {
      debug!(packages = ?pkg.packages, "entering ADD --apt pipeline, will solve mid-compile");
      let result = tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = apt::extend(graph, state.root, &pkg.packages, Some(&stage.platform), engine, &options.apt) => result
      };
      let (installed, history) = result?;
      state.root = installed;
      for (entry_label, phase) in history {
        let empty_layer = !matches!(phase, apt::PackageState::Installed);
        state.config.record_history(entry_label, empty_layer, options.source_date_epoch);
      }
    },

    Instruction::Run(run) => {
      let args = exec_args(&run.form, &state.shell, &state.scope, &mut state.lints)?;
      let spec = crate::graph::ExecSpec {
        args,
        env: state.scope.env.clone().into_iter().collect(),
        user: state.config.user.clone(),
        cwd: state.workdir.clone(),
        network: run.network.clone(),
        security: run.security.clone(),
        mounts: run.mounts.clone(),
        platform: Some(stage.platform.clone())
      };
      state.root = graph.push(NodeKind::Exec { inputs: vec![state.root], spec });
      state.config.record_history(label, false, options.source_date_epoch);
    },

    Instruction::Cmd(cmd) => {
      warn_if_repeated(state, "CMD");
      state.config.cmd = Some(exec_args(&cmd.form, &state.shell, &state.scope, &mut state.lints)?);
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Entrypoint(ep) => {
      warn_if_repeated(state, "ENTRYPOINT");
      state.config.entrypoint = Some(exec_args(&ep.form, &state.shell, &state.scope, &mut state.lints)?);
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Healthcheck(HealthcheckInstruction::None) => {
      warn_if_repeated(state, "HEALTHCHECK");
      state.config.healthcheck = None;
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Healthcheck(HealthcheckInstruction::Cmd {
      test, interval, timeout, start_period, start_interval, retries, ..
    }) => {
      warn_if_repeated(state, "HEALTHCHECK");
      let expanded = expand_str(test, &state.scope, &mut state.lints)?;
      state.config.healthcheck = Some(Healthcheck {
        test: vec!["CMD-SHELL".to_string(), expanded],
        interval: *interval,
        timeout: *timeout,
        start_period: *start_period,
        start_interval: *start_interval,
        retries: *retries
      });
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Expose(expose) => {
      warn_if_repeated(state, "EXPOSE");
      for port in &expose.ports {
        state.config.exposed_ports.push((port.port, port.protocol.clone()));
      }
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::User(user) => {
      warn_if_repeated(state, "USER");
      let u = expand_str(&user.user, &state.scope, &mut state.lints)?;
      let g = match &user.group {
        Some(group) => Some(expand_str(group, &state.scope, &mut state.lints)?),
        None => None
      };
      state.config.user = Some(match g {
        Some(g) => format!("{}:{}", u, g),
        None => u
      });
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Volume(volume) => {
      warn_if_repeated(state, "VOLUME");
      for path in &volume.paths {
        let expanded = expand_str(path, &state.scope, &mut state.lints)?;
        if !state.config.volumes.contains(&expanded) {
          state.config.volumes.push(expanded);
        }
      }
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Workdir(workdir) => {
      let expanded = expand_str(&workdir.path, &state.scope, &mut state.lints)?;
      let (joined, was_relative) = join_workdir(&state.workdir, &expanded);
      if was_relative && state.workdir.is_none() {
        state.lints.push(Lint::new(
          LintCode::RelativeWorkdir,
          format!("WORKDIR '{}' is relative with no prior absolute WORKDIR", expanded),
          None
        ));
      }
      state.workdir = Some(joined.clone());
      state.config.workdir = Some(joined);
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Shell(shell) => {
      state.shell = shell.shell.clone();
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Onbuild(onbuild) => {
      state.config.onbuild.push(onbuild.trigger.clone());
      state.config.record_history(label, true, options.source_date_epoch);
    },

    Instruction::Stopsignal(stopsignal) => {
      warn_if_repeated(state, "STOPSIGNAL");
      let expanded = expand_str(&stopsignal.signal, &state.scope, &mut state.lints)?;
      state.config.stop_signal = Some(expanded);
      state.config.record_history(label, true, options.source_date_epoch);
    }
  }

  Ok(())
}
