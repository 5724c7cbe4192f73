// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

/// Sharing mode for a `--mount=type=cache` mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSharing {
  Shared,
  Private,
  Locked
}

impl Default for CacheSharing {
  fn default() -> Self {
    CacheSharing::Shared
  }
}

/// One `--mount=...` entry on a `RUN` instruction, and the corresponding
/// attachment on an `Exec` graph node.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mount {
  Bind {
    source: String,
    target: String,
    from: Option<String>,
    read_only: bool
  },
  Cache {
    id: String,
    target: String,
    sharing: CacheSharing
  },
  Tmpfs {
    target: String
  },
  Secret {
    id: String,
    target: Option<String>
  },
  Ssh {
    id: Option<String>,
    target: Option<String>
  }
}

impl Mount {
  pub fn target(&self) -> &str {
    match self {
      Mount::Bind { target, .. } => target,
      Mount::Cache { target, .. } => target,
      Mount::Tmpfs { target } => target,
      Mount::Secret { target, .. } => target.as_deref().unwrap_or("/run/secrets"),
      Mount::Ssh { target, .. } => target.as_deref().unwrap_or("/run/buildkit/ssh_agent.0")
    }
  }

  /// Parses a single `--mount=key=value,key=value,...` flag value.
  pub fn parse(spec: &str) -> crate::error::Result<Mount> {
    let mut kv = std::collections::HashMap::new();
    for field in spec.split(',') {
      match field.split_once('=') {
        Some((k, v)) => { kv.insert(k.to_string(), v.to_string()); },
        None => { kv.insert(field.to_string(), String::new()); }
      }
    }

    let ty = kv.get("type").map(String::as_str).unwrap_or("bind");
    let target = kv.get("target").or_else(|| kv.get("dst")).or_else(|| kv.get("destination"))
      .cloned();

    match ty {
      "bind" => Ok(Mount::Bind {
        source: kv.get("source").or_else(|| kv.get("src")).cloned().unwrap_or_default(),
        target: target.ok_or_else(|| crate::error::parse_error("bind mount requires target", None))?,
        from: kv.get("from").cloned(),
        read_only: kv.get("readonly").or_else(|| kv.get("ro")).map(|v| v != "false").unwrap_or(false)
      }),
      "cache" => Ok(Mount::Cache {
        id: kv.get("id").cloned().unwrap_or_else(|| target.clone().unwrap_or_default()),
        target: target.ok_or_else(|| crate::error::parse_error("cache mount requires target", None))?,
        sharing: match kv.get("sharing").map(String::as_str) {
          Some("private") => CacheSharing::Private,
          Some("locked") => CacheSharing::Locked,
          _ => CacheSharing::Shared
        }
      }),
      "tmpfs" => Ok(Mount::Tmpfs {
        target: target.ok_or_else(|| crate::error::parse_error("tmpfs mount requires target", None))?
      }),
      "secret" => Ok(Mount::Secret {
        id: kv.get("id").cloned().unwrap_or_default(),
        target
      }),
      "ssh" => Ok(Mount::Ssh { id: kv.get("id").cloned(), target }),
      other => Err(crate::error::parse_error(format!("unknown mount type '{}'", other), None))
    }
  }
}
