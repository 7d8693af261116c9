//! Domain types for participation scoring

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScoringError;

pub use voterscore_common::db::VoterRow;

/// Registration status of a voter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoterStatus {
    Active,
    Inactive,
}

impl VoterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoterStatus::Active => "Active",
            VoterStatus::Inactive => "Inactive",
        }
    }
}

impl FromStr for VoterStatus {
    type Err = ScoringError;

    /// Accepts exactly `Active` or `Inactive`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(VoterStatus::Active),
            "Inactive" => Ok(VoterStatus::Inactive),
            other => Err(ScoringError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for VoterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// General vs everything else (primaries, specials, runoffs, recalls)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElectionClass {
    General,
    NonGeneral,
}

/// One observed vote in a voter's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    pub election_date: NaiveDate,
    pub election_type: String,
    pub party: Option<String>,
    pub ballot_style: Option<String>,
    pub absentee: bool,
    pub provisional: bool,
    pub supplemental: bool,
}

impl HistoryEvent {
    /// Event with only the fields scoring looks at
    pub fn new(election_date: NaiveDate, election_type: impl Into<String>) -> Self {
        Self {
            election_date,
            election_type: election_type.into(),
            party: None,
            ballot_style: None,
            absentee: false,
            provisional: false,
            supplemental: false,
        }
    }

    /// Classification of this event's election type
    pub fn class(&self) -> ElectionClass {
        crate::scoring::history::classify_election_type(&self.election_type)
    }
}

/// A voter after status and history validation
#[derive(Debug, Clone, PartialEq)]
pub struct VoterRecord {
    pub registration_number: String,
    pub status: VoterStatus,
    pub history: Vec<HistoryEvent>,
}

/// A computed score ready to be written back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredVoter {
    pub registration_number: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_exact() {
        assert_eq!("Active".parse::<VoterStatus>(), Ok(VoterStatus::Active));
        assert_eq!("Inactive".parse::<VoterStatus>(), Ok(VoterStatus::Inactive));
    }

    #[test]
    fn test_status_parse_rejects_other_values() {
        for bad in ["active", "ACTIVE", "", "Suspended", " Active"] {
            assert_eq!(
                bad.parse::<VoterStatus>(),
                Err(ScoringError::InvalidStatus(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }
}
