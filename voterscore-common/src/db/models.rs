//! Database models

use serde::{Deserialize, Serialize};

/// One voter as read from the registry for scoring.
///
/// `status` and `history` are carried exactly as stored; validation happens
/// in the scoring layer so that a bad row fails alone instead of failing the
/// page read. `history` is a JSON array of history event objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoterRow {
    pub registration_number: String,
    pub status: String,
    pub history: String,
}

/// One row of the `voter_history` table
///
/// Only used to seed history through [`crate::db::insert_history`]; the
/// scoring read aggregates history into [`VoterRow::history`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryRow {
    pub registration_number: String,
    pub election_date: String,
    pub election_type: String,
    pub party: Option<String>,
    pub ballot_style: Option<String>,
    pub absentee: bool,
    pub provisional: bool,
    pub supplemental: bool,
}
