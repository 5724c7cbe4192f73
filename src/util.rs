// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use snafu::ResultExt;

use crate::error::*;

/// Returns true if `s` (trimmed) looks like the JSON-array ("exec") form
/// shared by `RUN`, `CMD`, `ENTRYPOINT` and required by `SHELL`.
pub(crate) fn is_json_array(s: &str) -> bool {
  s.trim_start().starts_with('[')
}

/// Parses a JSON string array, as used by the exec form of `RUN`/`CMD`/
/// `ENTRYPOINT` and the mandatory form of `SHELL`.
pub(crate) fn parse_json_string_array(s: &str) -> Result<Vec<String>> {
  serde_json::from_str(s).map_err(|e| parse_error(
    format!("invalid JSON array: {}", e), None
  ))
}

/// Unquotes a single- or double-quoted string token.
pub(crate) fn unquote(s: &str) -> Result<String> {
  enquote::unquote(s).context(UnescapeErrorSnafu)
}

/// Splits a `KEY` or `KEY=VALUE` token, rejecting blank keys.
pub(crate) fn split_key_value(token: &str) -> Result<(String, Option<String>)> {
  match token.split_once('=') {
    Some((k, v)) if !k.is_empty() => Ok((k.to_string(), Some(v.to_string()))),
    Some((k, _)) if k.is_empty() => Err(parse_error("blank key in KEY=VALUE token", None)),
    _ => {
      if token.is_empty() {
        return Err(parse_error("blank key", None));
      }
      Ok((token.to_string(), None))
    }
  }
}

/// Splits `s` into whitespace-separated tokens, treating `'...'`/`"..."`
/// runs (with backslash escapes) as atomic. Used by `ENV`/`LABEL` to tokenize
/// `KEY=VALUE` pairs where either side may be a quoted, space-containing
/// string.
pub(crate) fn split_respecting_quotes(s: &str) -> Vec<String> {
  let mut tokens = Vec::new();
  let mut current = String::new();
  let mut quote: Option<char> = None;
  let mut escaped = false;
  let mut in_token = false;

  for ch in s.chars() {
    if escaped {
      current.push(ch);
      escaped = false;
      continue;
    }

    match quote {
      Some(q) => {
        current.push(ch);
        if ch == '\\' {
          escaped = true;
        } else if ch == q {
          quote = None;
        }
      },
      None => {
        if ch.is_whitespace() {
          if in_token {
            tokens.push(std::mem::take(&mut current));
            in_token = false;
          }
        } else {
          in_token = true;
          current.push(ch);
          if ch == '\'' || ch == '"' {
            quote = Some(ch);
          }
        }
      }
    }
  }

  if in_token {
    tokens.push(current);
  }

  tokens
}

/// Splits one `KEY=VALUE` token (as produced by [`split_respecting_quotes`])
/// into its name and value, unquoting either side if quoted.
pub(crate) fn split_kv_token(token: &str) -> Result<(String, String)> {
  let bytes = token.as_bytes();
  let mut quote: Option<char> = None;
  let mut escaped = false;
  let mut split_at = None;

  for (i, ch) in token.char_indices() {
    if escaped {
      escaped = false;
      continue;
    }

    match quote {
      Some(q) => {
        if ch == '\\' {
          escaped = true;
        } else if ch == q {
          quote = None;
        }
      },
      None => {
        if ch == '\'' || ch == '"' {
          quote = Some(ch);
        } else if ch == '=' {
          split_at = Some(i);
          break;
        }
      }
    }
  }

  let _ = bytes;
  let idx = split_at.ok_or_else(|| parse_error(format!("expected KEY=VALUE, found '{}'", token), None))?;
  let (raw_name, raw_value) = (&token[..idx], &token[idx + 1..]);

  let name = if raw_name.starts_with('"') || raw_name.starts_with('\'') {
    unquote(raw_name)?
  } else {
    raw_name.to_string()
  };

  if name.is_empty() {
    return Err(parse_error("blank key in KEY=VALUE token", None));
  }

  let value = if raw_value.starts_with('"') || raw_value.starts_with('\'') {
    unquote(raw_value)?
  } else {
    raw_value.to_string()
  };

  Ok((name, value))
}
