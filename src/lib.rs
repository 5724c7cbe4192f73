// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

#![forbid(unsafe_code)]

mod apt;
mod ast;
mod config;
mod context;
mod dispatch;
mod engine;
mod error;
mod expand;
mod graph;
mod image;
mod instruction;
mod instructions;
mod lint;
mod mount;
mod options;
mod platform;
mod resolver;
mod span;
mod util;

pub use apt::{PackageState, PackageUri};
pub use config::{Healthcheck, HistoryEntry, ImageConfig};
pub use context::{BuildContext, MemoryContext};
pub use dispatch::{dispatch_stage, DispatchOutput};
pub use engine::{BoxFuture, BuildEngine, Ref};
pub use error::{Error, Result};
pub use expand::{expand, Expansion, Scope};
pub use graph::{ExecSpec, FileEntry, Graph, Node, NodeId, NodeKind, Source};
pub use image::ImageRef;
pub use instruction::{Dockerfile, Instruction};
pub use instructions::*;
pub use lint::{Lint, LintCode};
pub use mount::{CacheSharing, Mount};
pub use options::{AptOptions, BuildOptions, CancellationToken};
pub use platform::Platform;
pub use resolver::{ancestors, resolve, select_target, Stage, StageBase, StageGraph};
pub use span::{Location, Span};

use std::collections::BTreeMap;

use tracing::{info, instrument};

/// The result of compiling a whole Dockerfile down to the target stage
///: the build graph plus the target's image config,
/// ready for transmission to the external build engine.
#[derive(Debug)]
pub struct CompileOutput {
  pub graph: Graph,
  pub config: ImageConfig,
  pub lints: Vec<Lint>
}

/// Compiles `source` end to end: parses it, resolves the stage
/// DAG, dispatches every stage the target stage transitively depends on in
/// topological order, and returns the merged graph plus the target's image
/// config. Stage indices only ever reference earlier stages, so
/// dispatching in ascending index order already respects every dependency.
#[instrument(level = "info", skip_all, fields(target = options.target_stage.as_deref().unwrap_or("<last>")))]
pub async fn compile(
  source: &str,
  options: &BuildOptions,
  context: &(dyn BuildContext + Sync),
  engine: &(dyn BuildEngine + Sync),
  cancel: &CancellationToken
) -> Result<CompileOutput> {
  let dockerfile = Dockerfile::parse(source)?;
  let stage_graph = resolve(&dockerfile, &options.build_args, &options.build_platform, &options.target_platform)?;
  let target = select_target(&stage_graph, options.target_stage.as_deref())?;
  let wanted = ancestors(&stage_graph, target);
  info!(stages = wanted.len(), "dispatching stages toward target");

  let mut graph = Graph::new();
  let mut stage_outputs: BTreeMap<usize, NodeId> = BTreeMap::new();
  let mut lints = stage_graph.lints.clone();
  let mut final_config = ImageConfig::new();

  for idx in wanted {
    if cancel.is_cancelled() {
      return Err(Error::Cancelled);
    }

    let stage = &stage_graph.stages[idx];
    let output = dispatch_stage(
      &mut graph, &stage_graph, stage, &stage_outputs, context, engine, options, cancel
    ).await?;

    lints.extend(output.lints);
    stage_outputs.insert(idx, output.root);
    if idx == target {
      final_config = output.config;
    }
  }

  info!(nodes = graph.nodes.len(), lints = lints.len(), "compile finished");
  Ok(CompileOutput { graph, config: final_config, lints })
}
