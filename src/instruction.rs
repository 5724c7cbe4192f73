// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use crate::ast::{self, Record};
use crate::error::*;
use crate::instructions::*;
use crate::lint::Lint;
use crate::span::{Location, Span};

/// The typed union of every Dockerfile instruction.
///
/// `ADD --apt` is not represented here as `Add`; the instruction model
/// resolves it to [`Instruction::Package`] directly, since every other flag
/// on an `--apt` `ADD` is ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
  From(FromInstruction),
  Arg(ArgInstruction),
  Env(EnvInstruction),
  Label(LabelInstruction),
  Maintainer(MaintainerInstruction),
  Add(AddInstruction),
  Copy(CopyInstruction),
  Package(PackageInstruction),
  Run(RunInstruction),
  Cmd(CmdInstruction),
  Entrypoint(EntrypointInstruction),
  Healthcheck(HealthcheckInstruction),
  Expose(ExposeInstruction),
  User(UserInstruction),
  Volume(VolumeInstruction),
  Workdir(WorkdirInstruction),
  Shell(ShellInstruction),
  Onbuild(OnbuildInstruction),
  Stopsignal(StopsignalInstruction)
}

impl Instruction {
  fn from_record(record: &Record, from_index: &mut usize) -> Result<(Instruction, Vec<Lint>)> {
    let keyword = record.keyword.to_ascii_uppercase();

    let (instruction, lints) = match keyword.as_str() {
      "FROM" => {
        let (from, lints) = FromInstruction::from_record(record, *from_index)?;
        *from_index += 1;
        (Instruction::From(from), lints)
      },
      "ARG" => (Instruction::Arg(ArgInstruction::from_record(record)?), vec![]),
      "ENV" => {
        let (env, lints) = EnvInstruction::from_record(record)?;
        (Instruction::Env(env), lints)
      },
      "LABEL" => (Instruction::Label(LabelInstruction::from_record(record)?), vec![]),
      "MAINTAINER" => (Instruction::Maintainer(MaintainerInstruction::from_record(record)?), vec![]),
      "ADD" => match AddInstruction::from_record(record)? {
        AddOutcome::Add(add) => (Instruction::Add(add), vec![]),
        AddOutcome::Package(pkg) => (Instruction::Package(pkg), vec![])
      },
      "COPY" => (Instruction::Copy(CopyInstruction::from_record(record)?), vec![]),
      "RUN" => (Instruction::Run(RunInstruction::from_record(record)?), vec![]),
      "CMD" => (Instruction::Cmd(CmdInstruction::from_record(record)?), vec![]),
      "ENTRYPOINT" => (Instruction::Entrypoint(EntrypointInstruction::from_record(record)?), vec![]),
      "HEALTHCHECK" => (Instruction::Healthcheck(HealthcheckInstruction::from_record(record)?), vec![]),
      "EXPOSE" => (Instruction::Expose(ExposeInstruction::from_record(record)?), vec![]),
      "USER" => (Instruction::User(UserInstruction::from_record(record)?), vec![]),
      "VOLUME" => (Instruction::Volume(VolumeInstruction::from_record(record)?), vec![]),
      "WORKDIR" => (Instruction::Workdir(WorkdirInstruction::from_record(record)?), vec![]),
      "SHELL" => (Instruction::Shell(ShellInstruction::from_record(record)?), vec![]),
      "ONBUILD" => (Instruction::Onbuild(OnbuildInstruction::from_record(record)?), vec![]),
      "STOPSIGNAL" => (Instruction::Stopsignal(StopsignalInstruction::from_record(record)?), vec![]),
      other => return Err(parse_error(format!("unknown instruction '{}'", other), None))
    };

    Ok((instruction, lints))
  }

  pub fn span(&self) -> Option<Span> {
    match self {
      Instruction::From(i) => Some(i.span),
      Instruction::Arg(i) => Some(i.span),
      Instruction::Env(i) => Some(i.span),
      Instruction::Label(i) => Some(i.span),
      Instruction::Maintainer(i) => Some(i.span),
      Instruction::Add(i) => Some(i.span),
      Instruction::Copy(i) => Some(i.span),
      Instruction::Package(i) => Some(i.span),
      Instruction::Run(i) => Some(i.span),
      Instruction::Cmd(i) => Some(i.span),
      Instruction::Entrypoint(i) => Some(i.span),
      Instruction::Healthcheck(HealthcheckInstruction::Cmd { span, .. }) => Some(*span),
      Instruction::Healthcheck(HealthcheckInstruction::None) => None,
      Instruction::Expose(i) => Some(i.span),
      Instruction::User(i) => Some(i.span),
      Instruction::Volume(i) => Some(i.span),
      Instruction::Workdir(i) => Some(i.span),
      Instruction::Shell(i) => Some(i.span),
      Instruction::Onbuild(i) => Some(i.span),
      Instruction::Stopsignal(i) => Some(i.span)
    }
  }

  /// The verbatim keyword this instruction renders as in a history entry,
  /// e.g. `"FROM"`, `"RUN"`.
  pub fn keyword(&self) -> &'static str {
    match self {
      Instruction::From(_) => "FROM",
      Instruction::Arg(_) => "ARG",
      Instruction::Env(_) => "ENV",
      Instruction::Label(_) => "LABEL",
      Instruction::Maintainer(_) => "MAINTAINER",
      Instruction::Add(_) => "ADD",
      Instruction::Copy(_) => "COPY",
      Instruction::Package(_) => "ADD",
      Instruction::Run(_) => "RUN",
      Instruction::Cmd(_) => "CMD",
      Instruction::Entrypoint(_) => "ENTRYPOINT",
      Instruction::Healthcheck(_) => "HEALTHCHECK",
      Instruction::Expose(_) => "EXPOSE",
      Instruction::User(_) => "USER",
      Instruction::Volume(_) => "VOLUME",
      Instruction::Workdir(_) => "WORKDIR",
      Instruction::Shell(_) => "SHELL",
      Instruction::Onbuild(_) => "ONBUILD",
      Instruction::Stopsignal(_) => "STOPSIGNAL"
    }
  }
}

/// If `err` carries no location, attaches one derived from `span` and
/// `content`. Used so parse-time errors surfaced from the per-instruction
/// modules (which don't have access to the full source text) still end up
/// pointing somewhere.
fn attach_location(err: Error, content: &str, span: Span) -> Error {
  let loc = || Some(Location::new(None, content, span));

  match err {
    Error::ParseError { message, location: None } => Error::ParseError { message, location: loc() },
    Error::ValidationError { message, location: None } => Error::ValidationError { message, location: loc() },
    Error::ResolveError { message, location: None } => Error::ResolveError { message, location: loc() },
    Error::ExpandError { message, location: None } => Error::ExpandError { message, location: loc() },
    other => other
  }
}

/// A parsed Dockerfile: every instruction in source order, plus any lints
/// accumulated while building the typed instruction model.
///
/// Tokenization of `content` into [`Record`]s is handled by
/// [`ast::parse_records`], a stand-in for the real (external) AST.
#[derive(Debug, Clone)]
pub struct Dockerfile {
  pub content: String,
  pub instructions: Vec<Instruction>,
  pub lints: Vec<Lint>
}

impl Dockerfile {
  pub fn parse(content: &str) -> Result<Dockerfile> {
    let records = ast::parse_records(content)?;
    let mut instructions = Vec::with_capacity(records.len());
    let mut lints = Vec::new();
    let mut from_index = 0usize;

    for record in &records {
      let (instruction, ins_lints) = Instruction::from_record(record, &mut from_index)
        .map_err(|e| attach_location(e, content, record.span))?;
      instructions.push(instruction);
      lints.extend(ins_lints);
    }

    Ok(Dockerfile { content: content.to_string(), instructions, lints })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_multi_instruction_file() {
    let dockerfile = Dockerfile::parse("FROM alpine:3.12\nRUN echo hi\n").unwrap();
    assert_eq!(dockerfile.instructions.len(), 2);
    assert!(matches!(dockerfile.instructions[0], Instruction::From(_)));
    assert!(matches!(dockerfile.instructions[1], Instruction::Run(_)));
  }

  #[test]
  fn from_index_increments_across_stages() {
    let dockerfile = Dockerfile::parse("FROM a\nFROM b\nFROM c\n").unwrap();
    let indices: Vec<usize> = dockerfile.instructions.iter().map(|i| match i {
      Instruction::From(f) => f.index,
      _ => panic!("expected From")
    }).collect();
    assert_eq!(indices, vec![0, 1, 2]);
  }

  #[test]
  fn unknown_instruction_is_a_parse_error() {
    assert!(Dockerfile::parse("BOGUS foo\n").is_err());
  }

  #[test]
  fn errors_carry_location() {
    let err = Dockerfile::parse("FROM alpine\nARG\n").unwrap_err();
    match err {
      Error::ParseError { location: Some(loc), .. } => assert_eq!(loc.line, 2),
      other => panic!("expected located ParseError, got {:?}", other)
    }
  }

  #[test]
  fn collects_lints_from_instructions() {
    let dockerfile = Dockerfile::parse("FROM alpine as Build\n").unwrap();
    assert!(!dockerfile.lints.is_empty());
  }
}
