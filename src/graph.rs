// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// The graph builder: a thin, deterministic builder over the
// target graph IR. The content address is a SHA-256 digest of a canonical
// JSON encoding of a node's inputs and parameters, which is what makes the
// determinism and cache-stability properties checkable.

use std::fmt;

use serde::Serialize;
use sha2::{Digest as _, Sha256};

use crate::mount::Mount;
use crate::platform::Platform;

/// A SHA-256 content address. `Display`s as lowercase hex, matching the
/// apt extension's `Acquire::ForceHash=sha256`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(#[serde(with = "hex_array")] pub [u8; 32]);

mod hex_array {
  use serde::Serializer;

  pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
  }
}

impl fmt::Debug for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "NodeId({})", hex::encode(self.0))
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", hex::encode(self.0))
  }
}

/// A source of filesystem content: the empty image, a registry image, the
/// local build context, a git repository, or an HTTP URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Source {
  Scratch,
  Image { reference: String, platform: Option<Platform> },
  Context { name: String },
  Git { url: String, reference: Option<String>, keep_git_dir: bool },
  Http { url: String, filename: Option<String>, checksum: Option<String> }
}

/// One destination entry of a [`NodeKind::File`] node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
  pub source_input: usize,
  pub source_path: String,
  pub dest_path: String,
  pub chown: Option<String>,
  pub chmod: Option<String>,
  pub mkdir: bool
}

/// The operation a [`NodeKind::Exec`] node runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecSpec {
  pub args: Vec<String>,
  pub env: Vec<(String, String)>,
  pub user: Option<String>,
  pub cwd: Option<String>,
  pub network: Option<String>,
  pub security: Option<String>,
  pub mounts: Vec<Mount>,
  pub platform: Option<Platform>
}

/// The operation a single graph node performs, over zero or more input
/// node ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
  Source(Source),
  Exec { inputs: Vec<NodeId>, spec: ExecSpec },
  File { inputs: Vec<NodeId>, entries: Vec<FileEntry> },
  Merge { inputs: Vec<NodeId> }
}

/// A node in the build graph: its operation plus its derived content
/// address. Nodes are immutable once built.
///
/// `name` is a human-readable progress label (e.g. `COPY (apt packages)`,
/// mirroring BuildKit's vertex names) and is deliberately outside
/// [`NodeKind`], so it never enters [`digest_of`] and two nodes that differ
/// only in label still share a content address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
  pub id: NodeId,
  pub kind: NodeKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>
}

/// The append-only, content-addressed build graph. Two structurally identical subgraphs produce byte-identical
/// [`NodeId`]s, since the id is derived purely from the node's own
/// canonical serialization (which itself only embeds its inputs' ids, not
/// their contents).
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
  pub nodes: Vec<Node>
}

fn digest_of(kind: &NodeKind) -> NodeId {
  // serde_json's map/struct field order is insertion order (the struct's
  // declared field order), so this is stable across runs without a
  // canonicalization pass.
  let encoded = serde_json::to_vec(kind).expect("NodeKind is always JSON-serializable");
  let mut hasher = Sha256::new();
  hasher.update(&encoded);
  let mut out = [0u8; 32];
  out.copy_from_slice(&hasher.finalize());
  NodeId(out)
}

impl Graph {
  pub fn new() -> Graph {
    Graph { nodes: Vec::new() }
  }

  /// Appends `kind` to the graph (if an identical node isn't already
  /// present) and returns its id. Structural sharing: two calls with
  /// equal `kind` values always return the same [`NodeId`] and never
  /// duplicate the node.
  pub fn push(&mut self, kind: NodeKind) -> NodeId {
    self.push_named(kind, None)
  }

  /// Like [`Graph::push`], but attaches a progress label to the node. The
  /// label never affects the returned id; if an identical, unlabelled node
  /// already exists, it's labelled in place rather than duplicated.
  pub fn push_named(&mut self, kind: NodeKind, name: Option<String>) -> NodeId {
    let id = digest_of(&kind);
    match self.nodes.iter_mut().find(|n| n.id == id) {
      Some(existing) => {
        if existing.name.is_none() {
          existing.name = name;
        }
      },
      None => self.nodes.push(Node { id, kind, name })
    }
    id
  }

  pub fn get(&self, id: NodeId) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == id)
  }

  /// A canonical serialization of the whole graph, used as the payload
  /// handed to [`crate::engine::BuildEngine::solve`].
  pub fn serialize(&self) -> Vec<u8> {
    serde_json::to_vec(self).expect("Graph is always JSON-serializable")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_node() -> NodeKind {
    NodeKind::Source(Source::Scratch)
  }

  #[test]
  fn identical_nodes_share_an_id() {
    let mut graph = Graph::new();
    let a = graph.push(scratch_node());
    let b = graph.push(scratch_node());
    assert_eq!(a, b);
    assert_eq!(graph.nodes.len(), 1);
  }

  #[test]
  fn different_nodes_have_different_ids() {
    let mut graph = Graph::new();
    let a = graph.push(scratch_node());
    let b = graph.push(NodeKind::Source(Source::Image {
      reference: "alpine".to_string(), platform: None
    }));
    assert_ne!(a, b);
  }

  #[test]
  fn determinism_across_separate_graphs() {
    let mut g1 = Graph::new();
    let mut g2 = Graph::new();
    let a = g1.push(scratch_node());
    let b = g2.push(scratch_node());
    assert_eq!(a, b);
  }

  #[test]
  fn exec_node_depends_on_its_inputs_id() {
    let mut graph = Graph::new();
    let base = graph.push(scratch_node());

    let exec = graph.push(NodeKind::Exec {
      inputs: vec![base],
      spec: ExecSpec {
        args: vec!["true".to_string()],
        env: vec![],
        user: None, cwd: None, network: None, security: None,
        mounts: vec![],
        platform: None
      }
    });

    assert_ne!(exec, base);
  }

  #[test]
  fn digest_display_is_lowercase_hex() {
    let mut graph = Graph::new();
    let id = graph.push(scratch_node());
    let rendered = id.to_string();
    assert_eq!(rendered.len(), 64);
    assert!(rendered.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
  }
}
