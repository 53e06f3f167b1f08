//! Error types for chain construction and option fetching

use std::fmt;

/// Errors a data source can report for a single fetch
///
/// None of these are fatal to the chain: the controller logs them and keeps
/// the field's last-known-good options.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Source is missing credentials or endpoint configuration
    NotConfigured(String),
    /// Transport failure (connect, timeout, TLS)
    Network(String),
    /// Backend answered with a non-success status
    Api { status: u16, message: String },
    /// Backend answered but the body could not be understood
    Decode(String),
    /// Source has no data for this request (fixtures, injected failures)
    Unavailable(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured(msg) => write!(f, "Source not configured: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Decode(msg) => write!(f, "Failed to decode response: {}", msg),
            Self::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Errors raised while declaring a chain or addressing its fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Two fields share a key
    DuplicateField(String),
    /// A field requires a key that is not declared anywhere in the chain
    UnknownDependency { field: String, requires: String },
    /// A field requires a key declared after it
    ForwardDependency { field: String, requires: String },
    /// An operation named a field the chain does not have
    UnknownField(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateField(key) => write!(f, "Field '{}' is declared twice", key),
            Self::UnknownDependency { field, requires } => {
                write!(f, "Field '{}' requires unknown field '{}'", field, requires)
            }
            Self::ForwardDependency { field, requires } => write!(
                f,
                "Field '{}' requires '{}', which is declared after it",
                field, requires
            ),
            Self::UnknownField(key) => write!(f, "Unknown field '{}'", key),
        }
    }
}

impl std::error::Error for ChainError {}
