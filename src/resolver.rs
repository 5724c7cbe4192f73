// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// The stage resolver: partitions a parsed Dockerfile into a
// stage DAG, resolves base images and platforms, and selects the ordered
// set of stages a particular build target requires.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::error::*;
use crate::expand::{expand, Scope};
use crate::image::ImageRef;
use crate::instruction::{Dockerfile, Instruction};
use crate::lint::{Lint, LintCode};
use crate::platform::Platform;

/// The resolved parent of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageBase {
  Scratch,
  /// An index into [`StageGraph::stages`].
  Stage(usize),
  Image(ImageRef)
}

/// One resolved stage: its base, its effective platform, and the slice of
/// instructions (in source order) belonging to it, starting with (and
/// including) its own `FROM`.
#[derive(Debug, Clone)]
pub struct Stage<'a> {
  pub index: usize,
  pub name: Option<String>,
  pub base: StageBase,
  pub platform: Platform,
  pub instructions: Vec<&'a Instruction>
}

/// The resolved stage DAG plus the global ARG environment the `FROM` lines
/// were expanded against.
#[derive(Debug, Clone)]
pub struct StageGraph<'a> {
  pub stages: Vec<Stage<'a>>,
  pub global_args: BTreeMap<String, Option<String>>,
  pub lints: Vec<Lint>
}

fn stage_name_valid(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_lowercase() => {},
    _ => return false
  }
  chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_' || c == '-')
}

const RESERVED_NAMES: [&str; 2] = ["scratch", "context"];

fn resolve_stage_ref(s: &str, by_name: &BTreeMap<String, usize>, defined_so_far: usize) -> Option<usize> {
  if let Ok(idx) = s.parse::<usize>() {
    if idx < defined_so_far {
      return Some(idx);
    }
  }
  by_name.get(&s.to_ascii_lowercase()).copied()
}

/// Resolves `dockerfile` into a [`StageGraph`] given the caller's build-arg
/// overrides and the build/target platform pair.
#[instrument(level = "debug", skip_all, fields(build_platform = %build_platform, target_platform = %target_platform))]
pub fn resolve<'a>(
  dockerfile: &'a Dockerfile,
  build_args: &BTreeMap<String, String>,
  build_platform: &Platform,
  target_platform: &Platform
) -> Result<StageGraph<'a>> {
  let mut lints = Vec::new();

  // Step 1: partition at each FROM; everything before the first FROM is a
  // global ARG declaration.
  let mut global_args: BTreeMap<String, Option<String>> = BTreeMap::new();
  let mut first_from_seen = false;
  let mut stage_bounds: Vec<usize> = Vec::new(); // instruction index of each FROM

  for (i, instruction) in dockerfile.instructions.iter().enumerate() {
    match instruction {
      Instruction::From(_) => {
        first_from_seen = true;
        stage_bounds.push(i);
      },
      Instruction::Arg(arg) if !first_from_seen => {
        for var in &arg.vars {
          let value = build_args.get(&var.name).cloned().or_else(|| var.value.clone());
          global_args.insert(var.name.clone(), value);
        }
      },
      _ => {}
    }
  }

  if stage_bounds.is_empty() {
    return Err(Error::ResolveError {
      message: "Dockerfile contains no FROM instructions".to_string(),
      location: None
    });
  }

  let mut global_scope = Scope::default();
  global_scope.global_args = global_args.clone();
  global_scope.env.insert("BUILDPLATFORM".to_string(), build_platform.to_string());
  global_scope.env.insert("TARGETPLATFORM".to_string(), target_platform.to_string());

  let mut stages: Vec<Stage<'a>> = Vec::with_capacity(stage_bounds.len());
  let mut by_name: BTreeMap<String, usize> = BTreeMap::new();

  for (stage_index, &start) in stage_bounds.iter().enumerate() {
    let end = stage_bounds.get(stage_index + 1).copied().unwrap_or(dockerfile.instructions.len());
    let instructions: Vec<&Instruction> = dockerfile.instructions[start..end].iter().collect();

    let from = match instructions[0] {
      Instruction::From(from) => from,
      _ => unreachable!("stage must start with FROM")
    };

    // Step 4: stage-name resolution / base image resolution.
    let image_expansion = expand(&from.image, &global_scope)?;
    lints.extend(image_expansion.warnings);
    let image_name = image_expansion.value;

    let base = if image_name.eq_ignore_ascii_case("scratch") {
      StageBase::Scratch
    } else if let Some(&parent_index) = by_name.get(&image_name.to_ascii_lowercase()) {
      StageBase::Stage(parent_index)
    } else {
      StageBase::Image(ImageRef::parse(&image_name))
    };

    // Reserved/duplicate stage-name checks.
    if let Some(alias) = &from.alias {
      let alias_lower = alias.to_ascii_lowercase();

      if RESERVED_NAMES.contains(&alias_lower.as_str()) {
        lints.push(Lint::new(
          LintCode::ReservedStageName,
          format!("stage name '{}' is reserved", alias),
          None
        ));
      } else if !stage_name_valid(&alias_lower) {
        return Err(Error::ResolveError {
          message: format!("invalid stage name '{}'", alias),
          location: None
        });
      }

      if by_name.contains_key(&alias_lower) {
        return Err(Error::ResolveError {
          message: format!("stage name '{}' is already defined", alias),
          location: None
        });
      } else {
        by_name.insert(alias_lower, stage_index);
      }
    }

    // Step 3: platform resolution.
    let platform = match &from.platform {
      None => target_platform.clone(),
      Some(raw) => {
        let trimmed = raw.trim();
        if trimmed == "$TARGETPLATFORM" || trimmed == "${TARGETPLATFORM}" {
          lints.push(Lint::new(
            LintCode::RedundantTargetPlatform,
            "--platform=$TARGETPLATFORM is already the default",
            Some(crate::span::Location::new(None, &dockerfile.content, from.span))
          ));
        } else if !trimmed.contains('$') {
          lints.push(Lint::new(
            LintCode::ExplicitPlatform,
            format!("--platform is pinned to the literal '{}' instead of a build arg", trimmed),
            Some(crate::span::Location::new(None, &dockerfile.content, from.span))
          ));
        }

        let expansion = expand(raw, &global_scope)?;
        lints.extend(expansion.warnings);
        Platform::parse(&expansion.value)
      }
    };

    stages.push(Stage {
      index: stage_index,
      name: from.alias.clone(),
      base,
      platform,
      instructions
    });
  }

  // Testable property 5: the stage DAG (base + COPY --from edges) must be
  // acyclic. By construction stage names only resolve against stages
  // defined earlier in the file, so this can only trip on a defensive bug;
  // we check it explicitly anyway since the resolver's contract promises
  // either a topological order or a ResolveError.
  check_acyclic(&stages)?;

  debug!(stages = stages.len(), lints = lints.len(), "resolved stage graph");
  Ok(StageGraph { stages, global_args, lints })
}

fn check_acyclic(stages: &[Stage]) -> Result<()> {
  // Rebuild name resolution incrementally so a `COPY --from=` can only
  // reference a stage defined earlier in the file, mirroring step 4's
  // resolution rule exactly (a forward reference is an image name, not an
  // edge).
  let mut edges: Vec<Vec<usize>> = vec![Vec::new(); stages.len()];
  let mut by_name: BTreeMap<String, usize> = BTreeMap::new();

  for stage in stages {
    if let StageBase::Stage(parent) = stage.base {
      edges[stage.index].push(parent);
    }

    for instruction in &stage.instructions {
      if let Instruction::Copy(copy) = instruction {
        if let Some(from) = &copy.from {
          if let Some(src) = resolve_stage_ref(from, &by_name, stage.index) {
            edges[stage.index].push(src);
          }
        }
      }
    }

    if let Some(name) = &stage.name {
      by_name.entry(name.to_ascii_lowercase()).or_insert(stage.index);
    }
  }

  let mut state = vec![0u8; stages.len()]; // 0 = unvisited, 1 = in-progress, 2 = done

  fn visit(i: usize, edges: &[Vec<usize>], state: &mut [u8]) -> Result<()> {
    match state[i] {
      1 => return Err(Error::ResolveError {
        message: "cyclic stage dependency".to_string(),
        location: None
      }),
      2 => return Ok(()),
      _ => {}
    }

    state[i] = 1;
    for &dep in &edges[i] {
      visit(dep, edges, state)?;
    }
    state[i] = 2;

    Ok(())
  }

  for i in 0..stages.len() {
    visit(i, &edges, &mut state)?;
  }

  Ok(())
}

/// Returns the index of the target stage the caller named; only it and
/// its ancestors get dispatched. `target` may be a stage name or a
/// numeric index; `None` selects the last stage.
pub fn select_target(graph: &StageGraph, target: Option<&str>) -> Result<usize> {
  match target {
    None => Ok(graph.stages.len() - 1),
    Some(name) => {
      if let Ok(idx) = name.parse::<usize>() {
        if idx < graph.stages.len() {
          return Ok(idx);
        }
      }

      graph.stages.iter()
        .find(|s| s.name.as_deref() == Some(&name.to_ascii_lowercase()))
        .map(|s| s.index)
        .ok_or_else(|| Error::ResolveError {
          message: format!("unknown target stage '{}'", name),
          location: None
        })
    }
  }
}

/// Returns the indices of `target` and every stage it (transitively)
/// depends on, via `FROM` bases and `COPY --from=`, in ascending order.
pub fn ancestors(graph: &StageGraph, target: usize) -> Vec<usize> {
  let by_name: BTreeMap<String, usize> = graph.stages.iter()
    .filter_map(|s| s.name.as_ref().map(|n| (n.clone(), s.index)))
    .collect();

  let mut reachable = vec![false; graph.stages.len()];
  let mut stack = vec![target];

  while let Some(i) = stack.pop() {
    if reachable[i] {
      continue;
    }
    reachable[i] = true;

    let stage = &graph.stages[i];
    if let StageBase::Stage(parent) = stage.base {
      stack.push(parent);
    }

    for instruction in &stage.instructions {
      if let Instruction::Copy(copy) = instruction {
        if let Some(from) = &copy.from {
          if let Some(src) = resolve_stage_ref(from, &by_name, graph.stages.len()) {
            stack.push(src);
          }
        }
      }
    }
  }

  (0..graph.stages.len()).filter(|&i| reachable[i]).collect()
}
