// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use snafu::Snafu;

use crate::span::Location;

/// A Dockerfile compilation error.
///
/// Every variant that can be attributed to a place in the source carries an
/// optional [`Location`] so hosts can underline the offending instruction.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
  #[snafu(display("malformed instruction: {}", message))]
  ParseError {
    message: String,
    location: Option<Location>
  },

  #[snafu(display("error unescaping string: {:?}", source))]
  UnescapeError {
    source: enquote::Error
  },

  #[snafu(display("{}", message))]
  ResolveError {
    message: String,
    location: Option<Location>
  },

  #[snafu(display("malformed variable expression: {}", message))]
  ExpandError {
    message: String,
    location: Option<Location>
  },

  #[snafu(display("mid-compile solve failed: {}", message))]
  ExecutionRequiredError {
    message: String
  },

  #[snafu(display("apt package resolution failed: {}", message))]
  PackageResolutionError {
    message: String
  },

  #[snafu(display("{}", message))]
  ValidationError {
    message: String,
    location: Option<Location>
  },

  #[snafu(display("build cancelled"))]
  Cancelled,

  #[snafu(display(
    "could not convert instruction '{:?}' to desired type '{}'", from, to
  ))]
  ConversionError {
    from: String,
    to: String
  }
}

/// A Dockerfile compilation Result.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Helper to create a parse error from an [`ast::Record`] or instruction.
pub(crate) fn parse_error<S: Into<String>>(message: S, location: Option<Location>) -> Error {
  Error::ParseError { message: message.into(), location }
}

pub(crate) fn validation_error<S: Into<String>>(message: S, location: Option<Location>) -> Error {
  Error::ValidationError { message: message.into(), location }
}
