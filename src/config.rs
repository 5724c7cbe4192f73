// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// The image config assembler: tracks the evolving OCI-ish
// image configuration for the stage currently being dispatched, and
// records one history entry per dispatched instruction.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// One entry in the image's build history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
  pub created_by: String,
  pub empty_layer: bool,
  /// Unix epoch seconds. Stable across runs only when the build supplied
  /// `--source-date-epoch`; otherwise `None`
  /// rather than a wall-clock value, since `serde_json` of a timestamp
  /// would break the determinism property.
  pub created_at: Option<i64>
}

/// A parsed `HEALTHCHECK CMD` (mirrors [`crate::HealthcheckInstruction`]
/// after expansion; `NONE` is represented as config.healthcheck == None).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Healthcheck {
  pub test: Vec<String>,
  pub interval: Option<Duration>,
  pub timeout: Option<Duration>,
  pub start_period: Option<Duration>,
  pub start_interval: Option<Duration>,
  pub retries: Option<u32>
}

/// The subset of the OCI image config schema this compiler populates
///. Full
/// OCI fidelity (rootfs diff-ids, arbitrary vendor fields) is out of
/// scope; this is what `CMD`/`ENTRYPOINT`/`ENV`/... actually mutate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageConfig {
  pub env: BTreeMap<String, String>,
  pub labels: BTreeMap<String, String>,
  pub cmd: Option<Vec<String>>,
  pub entrypoint: Option<Vec<String>>,
  pub healthcheck: Option<Healthcheck>,
  pub exposed_ports: Vec<(u16, String)>,
  pub volumes: Vec<String>,
  pub user: Option<String>,
  pub workdir: Option<String>,
  pub stop_signal: Option<String>,
  pub onbuild: Vec<String>,
  pub history: Vec<HistoryEntry>
}

impl ImageConfig {
  pub fn new() -> ImageConfig {
    ImageConfig::default()
  }

  /// Appends a history entry. `source_date_epoch`, when set, is used for
  /// every entry so the same Dockerfile always produces the same config
  /// JSON.
  pub fn record_history(
    &mut self,
    created_by: impl Into<String>,
    empty_layer: bool,
    source_date_epoch: Option<i64>
  ) {
    self.history.push(HistoryEntry {
      created_by: created_by.into(),
      empty_layer,
      created_at: source_date_epoch
    });
  }

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string(self)
  }
}
