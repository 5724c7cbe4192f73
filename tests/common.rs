// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::sync::Once;

use dockerfile_graph::{BoxFuture, BuildEngine, Error, Ref, Result};

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber once per test binary, gated on
/// `RUST_LOG` like the rest of the corpus, so a failing integration test
/// can be re-run with `RUST_LOG=dockerfile_graph=debug` for the instruction
/// and apt-phase trace events.
pub fn init_tracing() {
  INIT.call_once(|| {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
  });
}

/// A [`BuildEngine`] that always fails the mid-compile solve. Useful for
/// scenarios that never reach `ADD --apt`.
pub struct NullEngine;

impl BuildEngine for NullEngine {
  fn solve<'a>(&'a self, _graph: &'a dockerfile_graph::Graph) -> BoxFuture<'a, Result<Ref>> {
    Box::pin(async move { Err(Error::ExecutionRequiredError { message: "no engine configured in this test".to_string() }) })
  }

  fn read<'a>(&'a self, _r: &'a Ref, _path: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
    Box::pin(async move { Err(Error::ExecutionRequiredError { message: "no engine configured in this test".to_string() }) })
  }
}

/// A [`BuildEngine`] fake that solves instantly and hands back a fixed
/// `apt-get install --print-uris` listing for any `read`: a deterministic
/// stand-in for a real engine that executes the graph against virtual
/// filesystems.
pub struct FakeAptEngine {
  pub listing: String
}

impl BuildEngine for FakeAptEngine {
  fn solve<'a>(&'a self, _graph: &'a dockerfile_graph::Graph) -> BoxFuture<'a, Result<Ref>> {
    Box::pin(async move { Ok(Ref("fake-ref".to_string())) })
  }

  fn read<'a>(&'a self, _r: &'a Ref, _path: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
    let listing = self.listing.clone();
    Box::pin(async move { Ok(listing.into_bytes()) })
  }
}
