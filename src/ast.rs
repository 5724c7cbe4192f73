// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP
//
// Dockerfile tokenization into an AST is an external collaborator. This
// module is the narrow boundary a real tokenizer would hand us: one
// [`Record`] per instruction, already split
// into a keyword, raw leading flags, a raw argument tail, and any attached
// heredoc bodies. `parse_records` is a convenience, non-authoritative
// tokenizer that exists only so the rest of the crate (and its tests) can
// be driven end-to-end from literal Dockerfile text.

use crate::span::Span;

/// A single `--name` or `--name=value` flag token, in original source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
  pub name: String,
  pub value: Option<String>,
  pub span: Span
}

/// A heredoc body attached to an instruction (`ADD`/`COPY`/`RUN <<EOF`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heredoc {
  pub name: String,
  /// `false` when the delimiter was quoted (`<<'EOF'`); the body is then
  /// literal and must not be variable-expanded.
  pub expand: bool,
  pub body: String
}

/// One Dockerfile instruction record, as handed down by the (external) AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  pub keyword: String,
  pub flags: Vec<Flag>,
  pub argument: String,
  pub heredocs: Vec<Heredoc>,
  pub span: Span
}

impl Record {
  pub fn flag(&self, name: &str) -> Option<&Flag> {
    self.flags.iter().find(|f| f.name == name)
  }

  pub fn flags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Flag> {
    self.flags.iter().filter(move |f| f.name == name)
  }
}

fn is_flag_token(tok: &str) -> bool {
  tok.starts_with("--") && tok.len() > 2
}

fn split_flags(rest: &str, base: usize) -> (Vec<Flag>, String) {
  let mut flags = Vec::new();
  let mut cursor = 0usize;
  let bytes = rest.as_bytes();

  loop {
    while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
      cursor += 1;
    }

    let token_start = cursor;
    if token_start >= bytes.len() {
      break;
    }

    let token_end = rest[token_start..]
      .find(char::is_whitespace)
      .map(|i| token_start + i)
      .unwrap_or(bytes.len());
    let token = &rest[token_start..token_end];

    if !is_flag_token(token) {
      break;
    }

    let span = Span::new(base + token_start, base + token_end);
    match token[2..].split_once('=') {
      Some((name, value)) => flags.push(Flag {
        name: name.to_string(),
        value: Some(value.trim_matches('"').to_string()),
        span
      }),
      None => flags.push(Flag { name: token[2..].to_string(), value: None, span })
    }

    cursor = token_end;
  }

  let argument = rest[cursor..].trim_start().to_string();
  (flags, argument)
}

fn strip_heredoc_markers(argument: &str) -> (String, Vec<(String, bool)>) {
  let mut markers = Vec::new();
  let mut out = String::new();
  let mut rest = argument;

  loop {
    match rest.find("<<") {
      None => {
        out.push_str(rest);
        break;
      },
      Some(idx) => {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 2..];
        let chomped = rest.strip_prefix('-').unwrap_or(rest);
        let (quote, after_quote) = match chomped.chars().next() {
          Some(q @ ('\'' | '"')) => (Some(q), &chomped[1..]),
          _ => (None, chomped)
        };

        let name_end = after_quote
          .find(|c: char| c.is_whitespace() || c == '\'' || c == '"')
          .unwrap_or(after_quote.len());
        let name = after_quote[..name_end].to_string();

        let mut tail = &after_quote[name_end..];
        if quote.is_some() {
          tail = tail.strip_prefix(quote.unwrap()).unwrap_or(tail);
        }

        markers.push((name, quote.is_none()));
        rest = tail;
      }
    }
  }

  (out, markers)
}

/// Tokenizes `source` into a sequence of instruction [`Record`]s.
///
/// This is a convenience stand-in for the real (external) Dockerfile
/// tokenizer: it understands backslash-newline continuation, `#`-prefixed
/// comments, and a single layer of heredocs, but performs none of the
/// arity/flag validation that belongs to the instruction model, nor any
/// linting.
pub fn parse_records(source: &str) -> crate::error::Result<Vec<Record>> {
  let mut records = Vec::new();
  let lines: Vec<&str> = source.split('\n').collect();
  let mut i = 0usize;
  let mut offset = 0usize;
  let mut line_offsets = Vec::with_capacity(lines.len());

  {
    let mut acc = 0usize;
    for line in &lines {
      line_offsets.push(acc);
      acc += line.len() + 1;
    }
  }

  while i < lines.len() {
    let start_offset = line_offsets[i];
    let mut logical = String::new();
    let mut j = i;

    loop {
      let line = lines[j];
      if let Some(stripped) = line.strip_suffix('\\') {
        logical.push_str(stripped);
        logical.push('\n');
        j += 1;
        if j >= lines.len() {
          break;
        }
      } else {
        logical.push_str(line);
        j += 1;
        break;
      }
    }

    let trimmed = logical.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
      i = j;
      continue;
    }

    let leading_ws = logical.len() - trimmed.len();
    let kw_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let keyword = trimmed[..kw_end].to_string();
    let rest = trimmed[kw_end..].trim_start();
    let rest_base = start_offset + leading_ws + (trimmed.len() - rest.len());

    let (flags, mut argument) = split_flags(rest, rest_base);
    let (clean_argument, markers) = strip_heredoc_markers(&argument);
    argument = clean_argument.trim_end().to_string();

    let mut heredocs = Vec::new();
    let mut k = j;
    for (name, expand) in markers {
      let mut body = String::new();
      while k < lines.len() {
        let body_line = lines[k];
        k += 1;
        if body_line.trim_end_matches('\r') == name {
          break;
        }
        body.push_str(body_line);
        body.push('\n');
      }
      heredocs.push(Heredoc { name, expand, body });
    }

    let end_offset = if k > 0 && k <= lines.len() {
      line_offsets.get(k).copied().unwrap_or(offset + logical.len())
    } else {
      start_offset + logical.len()
    };

    records.push(Record {
      keyword,
      flags,
      argument,
      heredocs,
      span: Span::new(start_offset, end_offset)
    });

    offset = end_offset;
    i = k.max(j);
  }

  Ok(records)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn splits_keyword_and_flags() {
    let records = parse_records("COPY --chown=1000:1000 --link a.txt /a.txt").unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.keyword, "COPY");
    assert_eq!(r.flags[0].name, "chown");
    assert_eq!(r.flags[0].value.as_deref(), Some("1000:1000"));
    assert_eq!(r.flags[1].name, "link");
    assert_eq!(r.flags[1].value, None);
    assert_eq!(r.argument, "a.txt /a.txt");
  }

  #[test]
  fn joins_continuations() {
    let records = parse_records("RUN echo foo \\\n  && echo bar").unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].argument.contains("echo bar"));
  }

  #[test]
  fn skips_comments_and_blanks() {
    let records = parse_records("# a comment\n\nFROM scratch\n").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].keyword, "FROM");
  }

  #[test]
  fn captures_heredoc_body() {
    let records = parse_records("RUN <<EOF\necho hi\nEOF\n").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].heredocs.len(), 1);
    assert_eq!(records[0].heredocs[0].name, "EOF");
    assert_eq!(records[0].heredocs[0].body, "echo hi\n");
  }
}
