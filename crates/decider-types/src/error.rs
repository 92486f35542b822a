use thiserror::Error;

/// Configuration-time errors: raised synchronously when a descriptor or
/// worker identity is built from bad values, never at decision-turn time.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown child policy {0:?}")]
    UnknownChildPolicy(String),
}
