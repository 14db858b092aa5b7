use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty {0} identifier")]
    EmptyIdentifier(&'static str),

    #[error("object body has no string `id` field")]
    MissingObjectId,
}
