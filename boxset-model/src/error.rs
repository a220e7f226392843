use std::fmt::{self, Display};

use crate::identifiers::IdentifierNamespace;

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    EmptyIdentifier(IdentifierNamespace),
    UnknownNamespace(String),
    InvalidHandle(String),
    EmptyName,
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::EmptyIdentifier(namespace) => {
                write!(f, "empty {namespace} identifier")
            }
            ModelError::UnknownNamespace(raw) => {
                write!(f, "unknown identifier namespace: {raw}")
            }
            ModelError::InvalidHandle(raw) => {
                write!(f, "invalid handle: {raw}")
            }
            ModelError::EmptyName => write!(f, "name cannot be empty"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
