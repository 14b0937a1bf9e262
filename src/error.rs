//! Error types for caller-input validation
//!
//! Parsing itself never fails: malformed markup and encoding trouble are
//! reported as data on the [`ParsedDocument`](crate::ParsedDocument). These
//! errors are only produced by helpers that validate caller-supplied values
//! ahead of time, such as an encoding hint.

use std::fmt;

/// Errors raised while validating caller-supplied parse settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The label does not name any known character encoding
    UnsupportedEncoding(String),
    /// The encoding is known but cannot be used to scan markup bytes
    NonAsciiCompatibleEncoding(&'static str),
}

impl ExtractError {
    /// Get numeric error code for host bindings
    pub fn code(&self) -> u32 {
        match self {
            ExtractError::UnsupportedEncoding(_) => 1,
            ExtractError::NonAsciiCompatibleEncoding(_) => 2,
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::UnsupportedEncoding(label) => {
                write!(f, "Unsupported encoding label: {:?}", label)
            }
            ExtractError::NonAsciiCompatibleEncoding(name) => {
                write!(f, "Encoding {} is not ASCII-compatible", name)
            }
        }
    }
}

impl std::error::Error for ExtractError {}
