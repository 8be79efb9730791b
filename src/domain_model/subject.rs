use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;

/// Identifier a token pair is issued for. Authenticated upstream, opaque here.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(pub String);

impl Subject {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Subject {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Subject(s.to_string()))
    }
}

impl From<&str> for Subject {
    fn from(s: &str) -> Self {
        Subject(s.to_string())
    }
}
