// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// Per-build options: everything the resolver and
// dispatcher need that doesn't live in the Dockerfile text itself. Kept as
// an explicit record rather than process-global state, so a single process
// can compile more than one Dockerfile concurrently with different
// platforms, build args or cache policy.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::platform::Platform;

/// Knobs specific to the `ADD --apt` package extension.
#[derive(Debug, Clone, Default)]
pub struct AptOptions {
  /// Skip the shared `apt-get update` cache mount and always refetch the
  /// index. Mirrors a plain build's `--no-cache`, scoped to apt alone.
  pub no_cache: bool
}

/// Everything a single [`crate::resolver::resolve`] + dispatch pass needs
/// besides the parsed [`crate::instruction::Dockerfile`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub build_platform: Platform,
  pub target_platform: Platform,
  pub target_stage: Option<String>,
  pub build_args: BTreeMap<String, String>,
  /// Unix epoch seconds substituted for wall-clock timestamps so that
  /// identical inputs produce an identical graph.
  pub source_date_epoch: Option<i64>,
  pub apt: AptOptions
}

impl BuildOptions {
  pub fn new(build_platform: Platform, target_platform: Platform) -> BuildOptions {
    BuildOptions {
      build_platform,
      target_platform,
      target_stage: None,
      build_args: BTreeMap::new(),
      source_date_epoch: None,
      apt: AptOptions::default()
    }
  }
}

/// A cooperative cancellation signal shared between the dispatcher's
/// independently-scheduled stage tasks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<Inner>);

#[derive(Debug, Default)]
struct Inner {
  cancelled: AtomicBool,
  notify: Notify
}

impl CancellationToken {
  pub fn new() -> CancellationToken {
    CancellationToken::default()
  }

  pub fn cancel(&self) {
    self.0.cancelled.store(true, Ordering::SeqCst);
    self.0.notify.notify_waiters();
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.cancelled.load(Ordering::SeqCst)
  }

  /// Resolves once [`CancellationToken::cancel`] has been called. Safe to
  /// race against other work with `tokio::select!`.
  pub async fn cancelled(&self) {
    if self.is_cancelled() {
      return;
    }
    self.0.notify.notified().await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_options_target_the_default_stage() {
    let opts = BuildOptions::new(Platform::parse("linux/amd64"), Platform::parse("linux/amd64"));
    assert!(opts.target_stage.is_none());
    assert!(opts.build_args.is_empty());
  }

  #[tokio::test]
  async fn cancellation_wakes_a_waiter() {
    let token = CancellationToken::new();
    let waiter = token.clone();
    let handle = tokio::spawn(async move {
      waiter.cancelled().await;
    });
    token.cancel();
    handle.await.unwrap();
    assert!(token.is_cancelled());
  }

  #[tokio::test]
  async fn already_cancelled_does_not_block() {
    let token = CancellationToken::new();
    token.cancel();
    token.cancelled().await;
  }
}
