//! Error types for the fiscal device client.
//!
//! # Design
//! `ApiError` covers only build-side failures — problems detected before a
//! request ever leaves the process. Response-shape and status-code problems
//! are absorbed into `FiscalResult` instead, so callers never need error
//! handling to detect a business-level failure, only a transport-level one
//! (and transport lives on the caller's side of the boundary entirely).

use std::fmt;

/// Errors returned by `FiscalClient` build methods.
#[derive(Debug)]
pub enum ApiError {
    /// The request payload could not be serialized to JSON.
    SerializationError(String),

    /// The caller-supplied request id is not a valid idempotency token.
    /// Every violated rule is listed, so an id that is both too long and
    /// contains an illegal character reports both.
    InvalidRequestId(Vec<RequestIdViolation>),
}

/// A single violated request-id rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIdViolation {
    /// The id exceeds the maximum length, counted in characters.
    TooLong { length: usize },

    /// The id contains a character outside the alphanumeric set. Only the
    /// first offending character is reported.
    InvalidCharacter { character: char, position: usize },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::SerializationError(msg) => {
                write!(f, "serialization failed: {msg}")
            }
            ApiError::InvalidRequestId(violations) => {
                write!(f, "invalid request id: ")?;
                for (i, violation) in violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for RequestIdViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIdViolation::TooLong { length } => {
                write!(f, "{length} characters exceeds the maximum length")
            }
            RequestIdViolation::InvalidCharacter {
                character,
                position,
            } => {
                write!(f, "non-alphanumeric character {character:?} at position {position}")
            }
        }
    }
}

impl std::error::Error for ApiError {}
