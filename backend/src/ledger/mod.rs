// The vote ledger: durable storage for categories, participants, the
// append-only vote log, and the per-participant tally cache.
//
// The trait is the seam between the vote engine and the store. The production
// implementation is [`store::DbLedger`] (MySQL via the rocket_db_pools
// diesel-async pool); tests run against an in-memory implementation with the
// same transactional semantics.

pub mod store;

#[cfg(test)]
pub mod memory;

use std::fmt;

use chrono::NaiveDateTime;

use crate::limiter::DayWindow;
use crate::models::{Category, Participant, TallyDrift};

pub use store::DbLedger;

#[derive(Debug)]
pub enum LedgerError {
    /// Transaction serialization conflict or deadlock. The attempt saw a
    /// consistent view and was rolled back; retrying is safe.
    Conflict,
    /// The store is unreachable or failing. Not retried.
    Unavailable(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Conflict => write!(f, "transaction conflict"),
            LedgerError::Unavailable(msg) => write!(f, "ledger unavailable: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Result of one atomic vote-recording transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The event row and the counter increment both committed.
    /// `votes_today` includes the vote just recorded.
    Accepted { votes_today: i64 },
    /// The in-transaction count was already at the limit; nothing was
    /// written.
    LimitReached,
}

#[rocket::async_trait]
pub trait Ledger: Send + Sync + 'static {
    async fn find_category(&self, id: i32) -> Result<Option<Category>, LedgerError>;

    async fn find_participant(&self, id: i32) -> Result<Option<Participant>, LedgerError>;

    /// Categories ordered by batch, then name. `batch` filters when given.
    async fn list_categories(&self, batch: Option<&str>) -> Result<Vec<Category>, LedgerError>;

    /// Participants of one category with live tallies, ordered by name.
    async fn list_participants(&self, category_id: i32)
        -> Result<Vec<Participant>, LedgerError>;

    /// Votes already recorded for (voter, category) inside `window`.
    async fn count_votes(
        &self,
        voter: &str,
        category_id: i32,
        window: &DayWindow,
    ) -> Result<i64, LedgerError>;

    /// The core write: in one transaction, count the voter's votes in
    /// `window` for `category_id`; if below `limit`, append a vote event at
    /// `occurred_at` and increment the participant's tally. Either both
    /// changes commit or neither does.
    async fn record_vote(
        &self,
        voter: &str,
        category_id: i32,
        participant_id: i32,
        window: &DayWindow,
        limit: u32,
        occurred_at: NaiveDateTime,
    ) -> Result<RecordOutcome, LedgerError>;

    /// Reconciliation auditor: recompute every participant's count from the
    /// vote log and report rows whose cached tally disagrees. Read-only;
    /// flags drift, never repairs it.
    async fn audit_tallies(&self) -> Result<Vec<TallyDrift>, LedgerError>;
}
