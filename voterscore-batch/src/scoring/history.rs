//! History normalization
//!
//! Turns the stored history payload into validated [`HistoryEvent`]s,
//! classifies election types and produces the most-recent-first view the
//! calculator consumes. Events are never silently dropped: a bad date fails
//! the whole record. The only filtering is the optional lookback window.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ScoringError;
use crate::models::{ElectionClass, HistoryEvent};

/// Keywords marking an election type as non-general (unless GENERAL also appears)
pub const NON_GENERAL_KEYWORDS: [&str; 4] = ["PRIMARY", "SPECIAL", "RUNOFF", "RECALL"];

const GENERAL_KEYWORD: &str = "GENERAL";

/// Classify a free-text election type.
///
/// GENERAL wins over every other keyword, so "SPECIAL GENERAL" is general.
/// Unrecognized types are treated as general.
pub fn classify_election_type(election_type: &str) -> ElectionClass {
    let upper = election_type.to_ascii_uppercase();
    if upper.contains(GENERAL_KEYWORD) {
        return ElectionClass::General;
    }
    if NON_GENERAL_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
        ElectionClass::NonGeneral
    } else {
        ElectionClass::General
    }
}

/// Parse a strict `YYYY-MM-DD` date.
///
/// Rejects anything that is not exactly ten characters of zero-padded digits
/// and dashes, then rejects impossible calendar dates (month 13, Feb 30, ...).
pub fn parse_election_date(raw: &str) -> Result<NaiveDate, ScoringError> {
    let bytes = raw.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(ScoringError::InvalidDate(raw.to_string()));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ScoringError::InvalidDate(raw.to_string()))
}

/// Stored shape of one history event
#[derive(Debug, Deserialize)]
struct StoredEvent {
    election_date: String,
    election_type: String,
    #[serde(default)]
    party: Option<String>,
    #[serde(default)]
    ballot_style: Option<String>,
    #[serde(default)]
    absentee: bool,
    #[serde(default)]
    provisional: bool,
    #[serde(default)]
    supplemental: bool,
}

/// History sorted most recent first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedHistory {
    events: Vec<HistoryEvent>,
}

impl NormalizedHistory {
    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn most_recent(&self) -> Option<&HistoryEvent> {
        self.events.first()
    }

    /// True if any event is a primary, special, runoff or recall
    pub fn has_non_general(&self) -> bool {
        self.events
            .iter()
            .any(|event| event.class() == ElectionClass::NonGeneral)
    }
}

/// Validates, filters and orders voter history relative to an evaluation date
#[derive(Debug, Clone, Copy)]
pub struct HistoryNormalizer {
    as_of: NaiveDate,
    lookback_years: Option<u32>,
}

impl HistoryNormalizer {
    pub fn new(as_of: NaiveDate, lookback_years: Option<u32>) -> Self {
        Self { as_of, lookback_years }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Whole years between `date` and the evaluation date; future dates count as 0
    pub fn years_since(&self, date: NaiveDate) -> u32 {
        self.as_of.years_since(date).unwrap_or(0)
    }

    /// Parse the stored JSON history payload into validated events
    pub fn parse(&self, payload: &str) -> Result<Vec<HistoryEvent>, ScoringError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| ScoringError::HistoryNotList(format!("unparseable payload: {}", e)))?;
        self.parse_value(value)
    }

    /// Validate an already-decoded history value
    pub fn parse_value(&self, value: Value) -> Result<Vec<HistoryEvent>, ScoringError> {
        let Value::Array(items) = value else {
            return Err(ScoringError::HistoryNotList(json_kind(&value).to_string()));
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let stored: StoredEvent = serde_json::from_value(item).map_err(|e| {
                    ScoringError::MalformedEvent {
                        index,
                        reason: e.to_string(),
                    }
                })?;
                Ok(HistoryEvent {
                    election_date: parse_election_date(&stored.election_date)?,
                    election_type: stored.election_type,
                    party: stored.party,
                    ballot_style: stored.ballot_style,
                    absentee: stored.absentee,
                    provisional: stored.provisional,
                    supplemental: stored.supplemental,
                })
            })
            .collect()
    }

    /// Apply the lookback window (if any) and sort most recent first
    pub fn normalize(&self, mut events: Vec<HistoryEvent>) -> NormalizedHistory {
        if let Some(limit) = self.lookback_years {
            events.retain(|event| self.years_since(event.election_date) <= limit);
        }
        // Stable: same-day events keep their stored order
        events.sort_by(|a, b| b.election_date.cmp(&a.election_date));
        NormalizedHistory { events }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
