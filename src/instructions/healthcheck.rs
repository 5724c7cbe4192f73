// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::time::Duration;

use crate::ast::Record;
use crate::error::*;
use crate::span::Span;

/// A Dockerfile [`HEALTHCHECK` instruction][healthcheck].
///
/// [healthcheck]: https://docs.docker.com/engine/reference/builder/#healthcheck
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum HealthcheckInstruction {
  None,
  Cmd {
    span: Span,
    test: String,
    interval: Option<Duration>,
    timeout: Option<Duration>,
    start_period: Option<Duration>,
    start_interval: Option<Duration>,
    retries: Option<u32>
  }
}

fn parse_duration(raw: &str, flag: &str) -> Result<Duration> {
  let (number, unit) = raw.split_at(
    raw.find(|c: char| c.is_alphabetic()).unwrap_or(raw.len())
  );

  let value: f64 = number.parse().map_err(|_| {
    validation_error(format!("invalid duration in --{}: '{}'", flag, raw), None)
  })?;

  let millis = match unit {
    "" | "s" => value * 1_000.0,
    "ms" => value,
    "m" => value * 60_000.0,
    "h" => value * 3_600_000.0,
    other => return Err(validation_error(format!("unknown duration unit '{}' in --{}", other, flag), None))
  };

  if millis < 1.0 {
    return Err(validation_error(format!("--{} must be at least 1ms", flag), None));
  }

  Ok(Duration::from_millis(millis as u64))
}

impl HealthcheckInstruction {
  pub(crate) fn from_record(record: &Record) -> Result<HealthcheckInstruction> {
    let argument = record.argument.trim();
    let mut tokens = argument.splitn(2, char::is_whitespace);
    let kind = tokens.next().unwrap_or("");

    if kind.eq_ignore_ascii_case("none") {
      return Ok(HealthcheckInstruction::None);
    }

    if !kind.eq_ignore_ascii_case("cmd") {
      return Err(parse_error(
        format!("HEALTHCHECK requires NONE or CMD, found '{}'", kind), None
      ));
    }

    let test = tokens.next().unwrap_or("").trim().to_string();
    if test.is_empty() {
      return Err(parse_error("HEALTHCHECK CMD requires a command", None));
    }

    let interval = record.flag("interval").and_then(|f| f.value.as_deref())
      .map(|v| parse_duration(v, "interval")).transpose()?;
    let timeout = record.flag("timeout").and_then(|f| f.value.as_deref())
      .map(|v| parse_duration(v, "timeout")).transpose()?;
    let start_period = record.flag("start-period").and_then(|f| f.value.as_deref())
      .map(|v| parse_duration(v, "start-period")).transpose()?;
    let start_interval = record.flag("start-interval").and_then(|f| f.value.as_deref())
      .map(|v| parse_duration(v, "start-interval")).transpose()?;

    let retries = record.flag("retries").and_then(|f| f.value.as_deref())
      .map(|v| v.parse::<u32>().map_err(|_| validation_error(
        format!("--retries must be a non-negative integer, found '{}'", v), None
      )))
      .transpose()?;

    Ok(HealthcheckInstruction::Cmd {
      span: record.span, test, interval, timeout, start_period, start_interval, retries
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::parse_records;

  fn parse(src: &str) -> Result<HealthcheckInstruction> {
    HealthcheckInstruction::from_record(&parse_records(src).unwrap()[0])
  }

  #[test]
  fn healthcheck_none() {
    assert_eq!(parse("HEALTHCHECK NONE").unwrap(), HealthcheckInstruction::None);
  }

  #[test]
  fn healthcheck_cmd_basic() {
    match parse("HEALTHCHECK CMD curl -f http://localhost/ || exit 1").unwrap() {
      HealthcheckInstruction::Cmd { test, retries, .. } => {
        assert_eq!(test, "curl -f http://localhost/ || exit 1");
        assert_eq!(retries, None);
      },
      _ => panic!("expected Cmd")
    }
  }

  #[test]
  fn healthcheck_cmd_with_flags() {
    match parse("HEALTHCHECK --interval=5s --timeout=3s --retries=3 CMD curl -f http://localhost/").unwrap() {
      HealthcheckInstruction::Cmd { interval, timeout, retries, .. } => {
        assert_eq!(interval, Some(Duration::from_secs(5)));
        assert_eq!(timeout, Some(Duration::from_secs(3)));
        assert_eq!(retries, Some(3));
      },
      _ => panic!("expected Cmd")
    }
  }

  #[test]
  fn healthcheck_sub_millisecond_interval_rejected() {
    assert!(parse("HEALTHCHECK --interval=0ms CMD true").is_err());
  }

  #[test]
  fn healthcheck_unknown_kind_rejected() {
    assert!(parse("HEALTHCHECK BOGUS true").is_err());
  }
}
