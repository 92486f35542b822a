use crate::error::DomainError;
use std::fmt;
use std::str::FromStr;

/// What the remote service should do with open child workflows when this
/// execution terminates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildPolicy {
    Terminate,
    RequestCancel,
    Abandon,
}

impl ChildPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ChildPolicy::Terminate => "TERMINATE",
            ChildPolicy::RequestCancel => "REQUEST_CANCEL",
            ChildPolicy::Abandon => "ABANDON",
        }
    }
}

impl fmt::Display for ChildPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChildPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TERMINATE" => Ok(ChildPolicy::Terminate),
            "REQUEST_CANCEL" => Ok(ChildPolicy::RequestCancel),
            "ABANDON" => Ok(ChildPolicy::Abandon),
            other => Err(DomainError::UnknownChildPolicy(other.to_string())),
        }
    }
}
