// Routing Relationships

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Destinations a record can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Success,
    Original,
    Failure,
}

impl Relationship {
    pub const ALL: [Relationship; 3] = [Relationship::Success, Relationship::Original, Relationship::Failure];

    pub fn name(&self) -> &'static str {
        match self {
            Relationship::Success => "success",
            Relationship::Original => "original",
            Relationship::Failure => "failure",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Relationship::Success => "A record is routed here with its content being the exported rows",
            Relationship::Original => "If this processor receives a record, it will be routed to this relationship",
            Relationship::Failure => "Records that were not successfully processed are routed here",
        }
    }

    /// Whether records sent here are dropped when nothing is connected
    pub fn auto_terminate_default(&self) -> bool {
        matches!(self, Relationship::Original)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Relationship::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown relationship: {}", s))
    }
}
