/*!
Error types for every phase: signature extraction, building, parsing,
callbacks and invocation. Parse errors are collected into [`ParseErrors`];
everything else aborts the phase that raised it.
*/

use std::fmt;

use joinery::JoinableIterator;
use lazy_format::lazy_format;
use thiserror::Error;

use crate::events::EventName;

/// Raised by an external reflection adapter; surfaced unchanged.
#[derive(Debug, Clone, Error)]
#[error("couldn't extract a signature from {object}: {message}")]
pub struct SignatureExtractionError {
    pub object: String,
    pub message: String,
}

/// A structural problem found while building the command tree. The first
/// one aborts the build.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("trigger {trigger} is claimed by both {first} and {second}")]
    DuplicateTrigger {
        trigger: String,
        first: String,
        second: String,
    },

    #[error("parameter {path} is declared more than once")]
    DuplicateParameter { path: String },

    #[error("{command} has more than one subcommand named {name:?}")]
    DuplicateSubcommand { command: String, name: String },

    #[error("can't classify parameter {path}: {reason}")]
    Unclassifiable { path: String, reason: String },

    #[error("no converter for parameter {path} of type {type_name}")]
    NoConverter { path: String, type_name: String },

    #[error("option {path} builds a list both by repetition and from a single run")]
    MixedListMechanisms { path: String },

    #[error("{path} has no usable triggers")]
    NoTriggers { path: String },

    #[error("{owner} has a malformed trigger {trigger:?}")]
    InvalidTrigger { trigger: String, owner: String },

    #[error(transparent)]
    Callback(#[from] CallbackError),
}

/// Whether a missing parameter was positional or triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    Argument,
    Option,
}

impl fmt::Display for MissingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissingKind::Argument => "argument",
            MissingKind::Option => "option",
        })
    }
}

/// A single problem with the command line. These are collected, so that one
/// bad token doesn't hide the next.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{parameter}: can't convert {raw:?} to {target}: {message}")]
    Conversion {
        parameter: String,
        raw: String,
        target: String,
        message: String,
    },

    #[error("{command}: required {kind} {parameter} was omitted")]
    Missing {
        command: String,
        parameter: String,
        kind: MissingKind,
    },

    #[error("option {token} is ambiguous; it could be any of {}", .candidates.join(", "))]
    AmbiguousOption {
        token: String,
        candidates: Vec<String>,
    },

    #[error("unrecognized argument {token:?}")]
    UnknownToken { token: String },

    #[error("{trigger} was given more than once for {parameter}")]
    DuplicateOption { parameter: String, trigger: String },

    #[error("{trigger} doesn't take a value (got {value:?})")]
    UnexpectedValue { trigger: String, value: String },

    #[error("{trigger} requires a value")]
    MissingValue { trigger: String },
}

/// Every error found in one parse attempt, in the order they were found.
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", listing(.errors))]
pub struct ParseErrors {
    errors: Vec<ParseError>,
}

impl ParseErrors {
    /// Wrap a list of errors; `None` if the list is empty.
    #[must_use]
    pub fn new(errors: Vec<ParseError>) -> Option<Self> {
        match errors.is_empty() {
            true => None,
            false => Some(Self { errors }),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<ParseError> {
        self.errors
    }
}

fn listing(errors: &[ParseError]) -> String {
    match errors {
        [single] => single.to_string(),
        errors => format!(
            "{} errors:\n  - {}",
            errors.len(),
            errors.iter().join_with("\n  - ")
        ),
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/**
An error raised by an event callback or an eager CLI callback. The dispatcher
stamps it with the event that was firing and the object path of the payload.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", failure(.event, .path))]
pub struct CallbackError {
    pub event: Option<EventName>,
    pub path: Option<String>,
    pub message: String,
}

impl CallbackError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            event: None,
            path: None,
            message: message.to_string(),
        }
    }

    /// Attach the firing context, keeping any context already present
    #[must_use]
    pub(crate) fn during(self, event: EventName, path: &str) -> Self {
        Self {
            event: self.event.or(Some(event)),
            path: self.path.or_else(|| Some(path.to_owned())),
            message: self.message,
        }
    }
}

fn failure<'a>(event: &'a Option<EventName>, path: &'a Option<String>) -> impl fmt::Display + 'a {
    lazy_format!(match ((event, path)) {
        (Some(event), Some(path)) => "{event} callback failed for {path}",
        (Some(event), None) => "{event} callback failed",
        (None, Some(path)) => "callback failed for {path}",
        (None, None) => "callback failed",
    })
}

/// Raised by a command handler
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InvokeError {
    pub message: String,
}

impl InvokeError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Everything that can go wrong in a full run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Signature(#[from] SignatureExtractionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Parse(#[from] ParseErrors),

    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error("{command} failed: {source}")]
    Invoke {
        command: String,
        source: InvokeError,
    },
}
