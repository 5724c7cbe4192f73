// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// The build engine capability.
// The compiler never talks to a concrete executor; it only ever holds a
// `&dyn BuildEngine`, which lets the apt extension
// submit a partial graph and read a file back out of its result without
// this crate knowing anything about the transport or the engine's own
// representation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::graph::Graph;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An opaque reference to the filesystem produced by a solved graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref(pub String);

impl fmt::Display for Ref {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The two-method capability the dispatcher needs from an external build
/// engine: solve a graph, then read a path out of its result. Every other
/// concern (scheduling, real execution, caching) belongs to the engine.
pub trait BuildEngine: Send + Sync {
  fn solve<'a>(&'a self, graph: &'a Graph) -> BoxFuture<'a, Result<Ref>>;
  fn read<'a>(&'a self, r: &'a Ref, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}
