// (C) Copyright 2020 Hewlett Packard Enterprise Development LP
//
// The shell-lex expander: a pure function over a snapshot of
// variable scope. It never executes anything; it only substitutes.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::*;
use crate::lint::{Lint, LintCode};

/// A three-tier variable environment snapshot.
///
/// Lookup order within an instruction is stage ENV, then stage ARG, then
/// global ARG. `stage_args`/`global_args` map a declared name to its bound
/// value; an entry present with `None` means the name is in scope (e.g. a
/// bare `ARG FOO` with no default and no build-arg override) but unbound,
/// which is treated the same as undefined for expansion purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
  pub env: BTreeMap<String, String>,
  pub stage_args: BTreeMap<String, Option<String>>,
  pub global_args: BTreeMap<String, Option<String>>
}

impl Scope {
  pub fn lookup(&self, name: &str) -> Option<&str> {
    if let Some(v) = self.env.get(name) {
      return Some(v.as_str());
    }
    if let Some(Some(v)) = self.stage_args.get(name) {
      return Some(v.as_str());
    }
    if let Some(Some(v)) = self.global_args.get(name) {
      return Some(v.as_str());
    }
    None
  }

  /// Returns a new scope with `name` bound to `value` in the ENV tier,
  /// per the invariant that mutation produces a new snapshot.
  pub fn with_env(&self, name: impl Into<String>, value: impl Into<String>) -> Scope {
    let mut next = self.clone();
    next.env.insert(name.into(), value.into());
    next
  }

  pub fn with_stage_arg(&self, name: impl Into<String>, value: Option<String>) -> Scope {
    let mut next = self.clone();
    next.stage_args.insert(name.into(), value);
    next
  }
}

/// The result of [`expand`]: the substituted text, the set of variable
/// names referenced (used by callers to compute cache-key inputs), and any
/// linter warnings produced (one per undefined-reference occurrence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
  pub value: String,
  pub used: BTreeSet<String>,
  pub warnings: Vec<Lint>
}

fn undefined_warning(name: &str) -> Lint {
  Lint::new(LintCode::UndefinedVariable, format!("'{}' is not defined in scope", name), None)
}

/// Expands `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR-default}`,
/// `${VAR:+alt}`, `${VAR+alt}`, and `${VAR/pat/repl}` references in `input`
/// against `scope`. Single-quoted runs are passed through literally
/// (without consuming the quote characters); everything else, including
/// double-quoted runs, is expanded. A backslash escapes the following
/// character. Undefined references expand to the empty string.
///
/// This function is pure and total: it never executes anything, and it is
/// defined for every `(input, scope)` pair except malformed `${...}`
/// expressions, which are reported as an [`Error::ExpandError`].
pub fn expand(input: &str, scope: &Scope) -> Result<Expansion> {
  let chars: Vec<char> = input.chars().collect();
  let mut out = String::new();
  let mut used = BTreeSet::new();
  let mut warnings = Vec::new();
  let mut i = 0usize;
  let mut single_quoted = false;

  while i < chars.len() {
    let c = chars[i];

    if single_quoted {
      out.push(c);
      if c == '\'' {
        single_quoted = false;
      }
      i += 1;
      continue;
    }

    match c {
      '\'' => {
        single_quoted = true;
        out.push(c);
        i += 1;
      },
      '\\' if i + 1 < chars.len() => {
        out.push(chars[i + 1]);
        i += 2;
      },
      '$' => {
        let (text, consumed, refs, warns) = expand_dollar(&chars, i, scope)?;
        out.push_str(&text);
        used.extend(refs);
        warnings.extend(warns);
        i += consumed;
      },
      _ => {
        out.push(c);
        i += 1;
      }
    }
  }

  Ok(Expansion { value: out, used, warnings })
}

fn is_name_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

/// Expands the `$...` reference starting at `chars[start]` (`chars[start]`
/// is `'$'`). Returns the expanded text, the number of source characters
/// consumed, the variable names referenced, and any warnings.
fn expand_dollar(
  chars: &[char],
  start: usize,
  scope: &Scope
) -> Result<(String, usize, Vec<String>, Vec<Lint>)> {
  let next = start + 1;
  if next >= chars.len() {
    return Ok(("$".to_string(), 1, vec![], vec![]));
  }

  if chars[next] == '{' {
    let close = find_closing_brace(chars, next)?;
    let inner: String = chars[next + 1..close].iter().collect();
    let (value, name, warnings) = expand_braced(&inner, scope)?;
    Ok((value, close - start + 1, vec![name], warnings))
  } else if is_name_start(chars[next]) {
    let name_start = next;
    let mut end = next;
    while end < chars.len() && is_name_char(chars[end]) {
      end += 1;
    }
    let name: String = chars[name_start..end].iter().collect();
    match scope.lookup(&name) {
      Some(v) => Ok((v.to_string(), end - start, vec![name], vec![])),
      None => Ok((String::new(), end - start, vec![name.clone()], vec![undefined_warning(&name)]))
    }
  } else {
    // '$' not followed by an identifier or '{' is passed through literally.
    Ok(("$".to_string(), 1, vec![], vec![]))
  }
}

fn find_closing_brace(chars: &[char], open: usize) -> Result<usize> {
  let mut i = open + 1;
  while i < chars.len() {
    if chars[i] == '}' {
      return Ok(i);
    }
    i += 1;
  }

  Err(Error::ExpandError {
    message: "unterminated '${' variable expression".to_string(),
    location: None
  })
}

/// Expands the contents of a `${...}` expression (without the braces).
/// Returns the expanded text, the referenced variable name, and warnings.
fn expand_braced(inner: &str, scope: &Scope) -> Result<(String, String, Vec<Lint>)> {
  let name_end = inner.find(|c: char| !is_name_char(c)).unwrap_or(inner.len());
  let name = &inner[..name_end];

  if name.is_empty() {
    return Err(Error::ExpandError {
      message: format!("malformed variable expression '${{{}}}'", inner),
      location: None
    });
  }

  let rest = &inner[name_end..];
  let bound = scope.lookup(name);
  let is_set = bound.is_some();
  let is_nonempty = bound.map(|v| !v.is_empty()).unwrap_or(false);
  let mut warnings = Vec::new();

  let value = if rest.is_empty() {
    match bound {
      Some(v) => v.to_string(),
      None => {
        warnings.push(undefined_warning(name));
        String::new()
      }
    }
  } else if let Some(default) = rest.strip_prefix(":-") {
    if is_nonempty { bound.unwrap().to_string() } else { expand(default, scope)?.value }
  } else if let Some(default) = rest.strip_prefix('-') {
    if is_set { bound.unwrap().to_string() } else { expand(default, scope)?.value }
  } else if let Some(alt) = rest.strip_prefix(":+") {
    if is_nonempty { expand(alt, scope)?.value } else { String::new() }
  } else if let Some(alt) = rest.strip_prefix('+') {
    if is_set { expand(alt, scope)?.value } else { String::new() }
  } else if let Some(patrepl) = rest.strip_prefix('/') {
    let base = match bound {
      Some(v) => v.to_string(),
      None => {
        warnings.push(undefined_warning(name));
        String::new()
      }
    };

    let mut parts = patrepl.splitn(2, '/');
    let pat = parts.next().unwrap_or("");
    let repl = parts.next().unwrap_or("");

    if pat.is_empty() {
      return Err(Error::ExpandError {
        message: format!("malformed variable expression '${{{}}}'", inner),
        location: None
      });
    }

    base.replacen(pat, repl, 1)
  } else {
    return Err(Error::ExpandError {
      message: format!("malformed variable expression '${{{}}}'", inner),
      location: None
    });
  };

  Ok((value, name.to_string(), warnings))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scope_with(env: &[(&str, &str)]) -> Scope {
    let mut scope = Scope::default();
    for (k, v) in env {
      scope.env.insert(k.to_string(), v.to_string());
    }
    scope
  }

  #[test]
  fn plain_text_passes_through() {
    let e = expand("hello world", &Scope::default()).unwrap();
    assert_eq!(e.value, "hello world");
    assert!(e.used.is_empty());
  }

  #[test]
  fn simple_dollar_var() {
    let scope = scope_with(&[("FOO", "bar")]);
    let e = expand("$FOO-baz", &scope).unwrap();
    assert_eq!(e.value, "bar-baz");
    assert!(e.used.contains("FOO"));
  }

  #[test]
  fn braced_var() {
    let scope = scope_with(&[("FOO", "bar")]);
    let e = expand("${FOO}baz", &scope).unwrap();
    assert_eq!(e.value, "barbaz");
  }

  #[test]
  fn undefined_expands_empty_and_warns_once() {
    let e = expand("x${MISSING}y", &Scope::default()).unwrap();
    assert_eq!(e.value, "xy");
    assert_eq!(e.warnings.len(), 1);
    assert_eq!(e.warnings[0].code, LintCode::UndefinedVariable);
  }

  #[test]
  fn colon_dash_default_on_unset_or_empty() {
    let unset = expand("${FOO:-fallback}", &Scope::default()).unwrap();
    assert_eq!(unset.value, "fallback");

    let empty = expand("${FOO:-fallback}", &scope_with(&[("FOO", "")])).unwrap();
    assert_eq!(empty.value, "fallback");
  }

  #[test]
  fn dash_default_only_on_unset() {
    let unset = expand("${FOO-fallback}", &Scope::default()).unwrap();
    assert_eq!(unset.value, "fallback");

    let empty = expand("${FOO-fallback}", &scope_with(&[("FOO", "")])).unwrap();
    assert_eq!(empty.value, "");
  }

  #[test]
  fn colon_plus_alt_on_nonempty() {
    let set = expand("${FOO:+alt}", &scope_with(&[("FOO", "x")])).unwrap();
    assert_eq!(set.value, "alt");

    let unset = expand("${FOO:+alt}", &Scope::default()).unwrap();
    assert_eq!(unset.value, "");
  }

  #[test]
  fn plus_alt_on_set() {
    let empty = expand("${FOO+alt}", &scope_with(&[("FOO", "")])).unwrap();
    assert_eq!(empty.value, "alt");
  }

  #[test]
  fn pattern_replace() {
    let scope = scope_with(&[("FOO", "a.b.c")]);
    let e = expand("${FOO/./-}", &scope).unwrap();
    assert_eq!(e.value, "a-b.c");
  }

  #[test]
  fn single_quotes_are_literal() {
    let scope = scope_with(&[("FOO", "bar")]);
    let e = expand("'$FOO'", &scope).unwrap();
    assert_eq!(e.value, "'$FOO'");
    assert!(e.used.is_empty());
  }

  #[test]
  fn double_quotes_still_expand() {
    let scope = scope_with(&[("FOO", "bar")]);
    let e = expand(r#""$FOO""#, &scope).unwrap();
    assert_eq!(e.value, r#""bar""#);
  }

  #[test]
  fn backslash_escapes() {
    let scope = scope_with(&[("FOO", "bar")]);
    let e = expand(r"\$FOO", &scope).unwrap();
    assert_eq!(e.value, "$FOO");
    assert!(e.used.is_empty());
  }

  #[test]
  fn scope_lookup_order_env_then_stage_arg_then_global_arg() {
    let mut scope = Scope::default();
    scope.global_args.insert("V".into(), Some("global".into()));
    assert_eq!(expand("$V", &scope).unwrap().value, "global");

    scope.stage_args.insert("V".into(), Some("stage".into()));
    assert_eq!(expand("$V", &scope).unwrap().value, "stage");

    scope.env.insert("V".into(), "env".into());
    assert_eq!(expand("$V", &scope).unwrap().value, "env");
  }

  #[test]
  fn unterminated_brace_errors() {
    assert!(expand("${FOO", &Scope::default()).is_err());
  }

  #[test]
  fn empty_pattern_in_replace_errors() {
    let scope = scope_with(&[("FOO", "bar")]);
    assert!(expand("${FOO//x}", &scope).is_err());
  }
}
