// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// The `ADD --apt` package extension, the hard subsystem: three
// graph phases, one of which requires solving the graph so far through the
// external build engine mid-compilation and reading a file back out of its
// result.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, instrument};

use crate::engine::BuildEngine;
use crate::error::{self, Result};
use crate::graph::{ExecSpec, FileEntry, Graph, NodeId, NodeKind, Source};
use crate::mount::{CacheSharing, Mount};
use crate::options::AptOptions;
use crate::platform::Platform;

const BASE_DIR: &str = "/btidor.syntax";
const CACHE_MOUNT_ID: &str = "btidor.syntax";

/// The apt config overrides every exec in this extension runs with, so that
/// the `--print-uris` listing always names SHA-256 digests and lands in a
/// predictable, build-private location.
fn apt_overrides() -> Vec<String> {
  [
    "Acquire::ForceHash=sha256",
    "Acquire::GzipIndexes=false",
    "Dir::Cache=/btidor.syntax/cache",
    "Dir::Cache::archives=archives/",
    "Dir::State=/btidor.syntax/state",
    "Dir::State::lists=lists/"
  ]
  .iter()
  .flat_map(|opt| ["-o".to_string(), opt.to_string()])
  .collect()
}

/// Progress through the extension's state machine. Exposed so tests (and a future progress
/// reporter) can observe how far a single `ADD --apt` got before an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
  Start,
  Updated,
  Resolved,
  Downloaded,
  Installed
}

/// One `apt-get install --print-uris` line, parsed into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUri {
  pub uri: String,
  pub filename: String,
  pub size: u64,
  pub sha256: Option<String>
}

lazy_static! {
  static ref URI_LINE: Regex =
    Regex::new(r"^'([^']*)'\s+([^ ]+)\s+([0-9]+)(\s+SHA256:([0-9a-fA-F]+))?$").unwrap();
}

/// Parses the full `--print-uris` listing. Order is
/// preserved; a non-empty line that doesn't match is a fatal
/// [`crate::error::Error::PackageResolutionError`].
pub fn parse_uri_listing(listing: &str) -> Result<Vec<PackageUri>> {
  let mut out = Vec::new();
  for line in listing.lines() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let caps = URI_LINE.captures(line).ok_or_else(|| error::Error::PackageResolutionError {
      message: format!("unparseable apt URI line: {:?}", line)
    })?;
    out.push(PackageUri {
      uri: caps[1].to_string(),
      filename: caps[2].to_string(),
      size: caps[3].parse().map_err(|_| error::Error::PackageResolutionError {
        message: format!("non-numeric size in apt URI line: {:?}", line)
      })?,
      sha256: caps.get(5).map(|m| m.as_str().to_lowercase())
    });
  }

  if out.is_empty() {
    return Err(error::Error::PackageResolutionError {
      message: "apt produced no URIs to download".to_string()
    });
  }

  Ok(out)
}

fn cache_mount() -> Mount {
  Mount::Cache {
    id: CACHE_MOUNT_ID.to_string(),
    target: format!("{}/state", BASE_DIR),
    sharing: CacheSharing::Shared
  }
}

fn base_exec_spec(args: Vec<String>, platform: Option<Platform>) -> ExecSpec {
  ExecSpec {
    args,
    env: vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())],
    user: None,
    cwd: None,
    network: None,
    security: None,
    mounts: vec![],
    platform
  }
}

fn shell(cmd: String) -> Vec<String> {
  vec!["/bin/sh".to_string(), "-c".to_string(), cmd]
}

/// Runs the full three-phase `ADD --apt` pipeline against
/// `stage_root`, the node id of the stage's filesystem immediately before
/// this instruction. Returns the node the stage should continue from
/// (Phase 3b's install layer) plus a `created_by` label per phase, in the
/// order the dispatcher should append them to the image's history.
#[instrument(level = "debug", skip(graph, engine, opts), fields(packages = %packages.join(" ")))]
pub async fn extend(
  graph: &mut Graph,
  stage_root: NodeId,
  packages: &[String],
  platform: Option<&Platform>,
  engine: &dyn BuildEngine,
  opts: &AptOptions
) -> Result<(NodeId, Vec<(String, PackageState)>)> {
  let names = packages.join(" ");
  let platform = platform.cloned();
  let mut history = Vec::new();

  // Phase 1: Update.
  let mut update_cmd = format!("mkdir -p {0}/state/lists/partial && apt-get update", BASE_DIR);
  for part in apt_overrides() {
    update_cmd.push(' ');
    update_cmd.push_str(&part);
  }
  update_cmd.push_str(" --yes --quiet");
  update_cmd.push_str(&format!(" && cp -r {0}/state {0}/backup", BASE_DIR));

  let mut update_spec = base_exec_spec(shell(update_cmd), platform.clone());
  // `--no-cache` on the apt extension means opting the index refresh out
  // of the host-shared cache mount; every
  // other phase is unaffected since they read the backup copy, not the
  // mount, by construction.
  if !opts.no_cache {
    update_spec.mounts = vec![cache_mount()];
  }

  let updated = graph.push(NodeKind::Exec {
    inputs: vec![stage_root],
    spec: update_spec
  });
  history.push((format!("ADD (apt update) {}", names), PackageState::Updated));

  // Phase 2: Resolve.
  let mut resolve_cmd = format!("rm -rf {0}/state && cp -r {0}/backup {0}/state && apt-get install -qq", BASE_DIR);
  for part in apt_overrides() {
    resolve_cmd.push(' ');
    resolve_cmd.push_str(&part);
  }
  resolve_cmd.push_str(" --print-uris");
  for pkg in packages {
    resolve_cmd.push(' ');
    resolve_cmd.push_str(pkg);
  }
  resolve_cmd.push_str(&format!(" > {}/install", BASE_DIR));

  let resolve_spec = base_exec_spec(shell(resolve_cmd), platform.clone());
  let resolved = graph.push(NodeKind::Exec {
    inputs: vec![updated],
    spec: resolve_spec
  });

  debug!("solving graph so far to read back the apt URI listing");
  let reference = engine.solve(graph).await?;
  let listing_bytes = engine.read(&reference, &format!("{}/install", BASE_DIR)).await?;
  let listing = String::from_utf8(listing_bytes).map_err(|source| error::Error::PackageResolutionError {
    message: format!("apt URI listing was not valid UTF-8: {}", source)
  })?;
  let uris = parse_uri_listing(&listing)?;
  debug!(count = uris.len(), "resolved apt package URIs");

  // Phase 2 resolves but does not itself contribute a history entry; the
  // three labeled phases are update, download, install. Its output node
  // still participates in the graph as Phase 3a's base.

  // Phase 3a: Download.
  let mut inputs = Vec::with_capacity(uris.len());
  let mut entries = Vec::with_capacity(uris.len());
  for uri in &uris {
    let source_input = inputs.len();
    inputs.push(graph.push(NodeKind::Source(Source::Http {
      url: uri.uri.clone(),
      filename: Some(uri.filename.clone()),
      checksum: uri.sha256.as_ref().map(|h| format!("sha256:{}", h))
    })));
    entries.push(FileEntry {
      source_input,
      source_path: "/".to_string(),
      dest_path: format!("{}/cache/archives/{}", BASE_DIR, uri.filename),
      chown: None,
      chmod: Some("0644".to_string()),
      mkdir: true
    });
  }
  // The accumulator starts from Phase 2's output.
  inputs.push(resolved);
  let downloaded = graph.push_named(
    NodeKind::File { inputs, entries },
    Some("COPY (apt packages)".to_string())
  );
  history.push((format!("ADD (apt download) {}", names), PackageState::Downloaded));

  // Phase 3b: Install, over the *original* stage root.
  let mut install_cmd = "apt-get install --no-download".to_string();
  for part in apt_overrides() {
    install_cmd.push(' ');
    install_cmd.push_str(&part);
  }
  install_cmd.push_str(" -qq");
  for pkg in packages {
    install_cmd.push(' ');
    install_cmd.push_str(pkg);
  }

  let mut install_spec = base_exec_spec(shell(install_cmd), platform);
  install_spec.mounts = vec![Mount::Bind {
    source: BASE_DIR.to_string(),
    target: BASE_DIR.to_string(),
    from: Some(downloaded.to_string()),
    read_only: false
  }];

  let installed = graph.push(NodeKind::Exec {
    inputs: vec![stage_root],
    spec: install_spec
  });
  history.push((format!("ADD (apt install) {}", names), PackageState::Installed));

  Ok((installed, history))
}
