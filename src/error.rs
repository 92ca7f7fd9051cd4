//! Failure catalog for parameter evaluation.
//!
//! Every failure raised by the engine is a [`ParamError`]. Callers tell kinds
//! apart through [`ParamError::kind`] (or by matching on the enum directly);
//! the node that produced the failure is available through
//! [`ParamError::name`] / [`ParamError::read_name`].

use std::fmt;
use thiserror::Error;

/// Stable identifier for each failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PatternNotMatch,
    NullNotAllowed,
    RequireSequence,
    RequireMapping,
    ValidatorCrushed,
    ProcessorCrushed,
}

impl ErrorKind {
    /// Upper-case code, e.g. `NULL_NOT_ALLOWED`.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::PatternNotMatch => "PATTERN_NOT_MATCH",
            ErrorKind::NullNotAllowed => "NULL_NOT_ALLOWED",
            ErrorKind::RequireSequence => "REQUIRE_SEQUENCE",
            ErrorKind::RequireMapping => "REQUIRE_MAPPING",
            ErrorKind::ValidatorCrushed => "VALIDATOR_CRUSHED",
            ErrorKind::ProcessorCrushed => "PROCESSOR_CRUSHED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised while evaluating a parameter spec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParamError {
    /// A pattern processor found no match in its input.
    #[error("Pattern not match")]
    PatternNotMatch,

    /// Null input at a non-nullable node without a default.
    #[error("Param {name}({read_name}) is not allowed null")]
    NullNotAllowed { name: String, read_name: String },

    /// A sequence node received something other than a sequence.
    #[error("Param {name}({read_name}) should be a list")]
    RequireSequence { name: String, read_name: String },

    /// A mapping node received something other than a mapping.
    #[error("Param {name}({read_name}) should be a dict")]
    RequireMapping { name: String, read_name: String },

    /// A validator failed with an error that is not a `ParamError`.
    #[error("Validator for {name}({read_name}) crushed")]
    ValidatorCrushed {
        name: String,
        read_name: String,
        debug_message: String,
    },

    /// A processor failed with an error that is not a `ParamError`.
    #[error("Processor for {name}({read_name}) crushed")]
    ProcessorCrushed {
        name: String,
        read_name: String,
        debug_message: String,
    },
}

impl ParamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParamError::PatternNotMatch => ErrorKind::PatternNotMatch,
            ParamError::NullNotAllowed { .. } => ErrorKind::NullNotAllowed,
            ParamError::RequireSequence { .. } => ErrorKind::RequireSequence,
            ParamError::RequireMapping { .. } => ErrorKind::RequireMapping,
            ParamError::ValidatorCrushed { .. } => ErrorKind::ValidatorCrushed,
            ParamError::ProcessorCrushed { .. } => ErrorKind::ProcessorCrushed,
        }
    }

    /// Canonical name of the failing node, if the failure is attributed to one.
    pub fn name(&self) -> Option<&str> {
        match self {
            ParamError::PatternNotMatch => None,
            ParamError::NullNotAllowed { name, .. }
            | ParamError::RequireSequence { name, .. }
            | ParamError::RequireMapping { name, .. }
            | ParamError::ValidatorCrushed { name, .. }
            | ParamError::ProcessorCrushed { name, .. } => Some(name.as_str()),
        }
    }

    /// Display name of the failing node, if the failure is attributed to one.
    pub fn read_name(&self) -> Option<&str> {
        match self {
            ParamError::PatternNotMatch => None,
            ParamError::NullNotAllowed { read_name, .. }
            | ParamError::RequireSequence { read_name, .. }
            | ParamError::RequireMapping { read_name, .. }
            | ParamError::ValidatorCrushed { read_name, .. }
            | ParamError::ProcessorCrushed { read_name, .. } => Some(read_name.as_str()),
        }
    }

    /// Message of the wrapped failure for the crushed kinds.
    pub fn debug_message(&self) -> Option<&str> {
        match self {
            ParamError::ValidatorCrushed { debug_message, .. }
            | ParamError::ProcessorCrushed { debug_message, .. } => Some(debug_message.as_str()),
            _ => None,
        }
    }

    pub(crate) fn null_not_allowed(name: &str, read_name: &str) -> Self {
        ParamError::NullNotAllowed {
            name: name.to_string(),
            read_name: read_name.to_string(),
        }
    }

    pub(crate) fn require_sequence(name: &str, read_name: &str) -> Self {
        ParamError::RequireSequence {
            name: name.to_string(),
            read_name: read_name.to_string(),
        }
    }

    pub(crate) fn require_mapping(name: &str, read_name: &str) -> Self {
        ParamError::RequireMapping {
            name: name.to_string(),
            read_name: read_name.to_string(),
        }
    }

    /// Wrap a foreign failure raised by a transform of `name`/`read_name`.
    pub(crate) fn crushed(
        validate_only: bool,
        name: &str,
        read_name: &str,
        debug_message: String,
    ) -> Self {
        let name = name.to_string();
        let read_name = read_name.to_string();
        if validate_only {
            ParamError::ValidatorCrushed {
                name,
                read_name,
                debug_message,
            }
        } else {
            ParamError::ProcessorCrushed {
                name,
                read_name,
                debug_message,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ParamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_follow_templates() {
        let e = ParamError::null_not_allowed("a", "Age");
        assert_eq!(e.to_string(), "Param a(Age) is not allowed null");
        assert_eq!(e.kind().code(), "NULL_NOT_ALLOWED");

        let e = ParamError::crushed(true, "a", "Age", "boom".into());
        assert_eq!(e.to_string(), "Validator for a(Age) crushed");
        assert_eq!(e.debug_message(), Some("boom"));
        assert_eq!(e.kind(), ErrorKind::ValidatorCrushed);
    }

    #[test]
    fn pattern_failure_has_no_owner() {
        let e = ParamError::PatternNotMatch;
        assert_eq!(e.name(), None);
        assert_eq!(e.read_name(), None);
        assert_eq!(e.to_string(), "Pattern not match");
    }
}
