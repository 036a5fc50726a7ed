// Read-only query façade for the presentation layers. Never mutates the
// ledger; every method is a single snapshot-consistent read.

use crate::ledger::{Ledger, LedgerError};
use crate::limiter::RateLimiter;
use crate::models::{Category, Participant, TallyDrift};

pub struct Queries<L> {
    ledger: L,
    limiter: RateLimiter,
}

impl<L: Ledger> Queries<L> {
    pub fn new(ledger: L, limiter: RateLimiter) -> Self {
        Queries { ledger, limiter }
    }

    /// Categories ordered by batch then name; optionally one batch only.
    pub async fn list_categories(
        &self,
        batch: Option<&str>,
    ) -> Result<Vec<Category>, LedgerError> {
        self.ledger.list_categories(batch).await
    }

    /// Participants of a category with live tallies, ordered by name.
    /// `None` when the category does not exist.
    pub async fn list_participants(
        &self,
        category_id: i32,
    ) -> Result<Option<Vec<Participant>>, LedgerError> {
        if self.ledger.find_category(category_id).await?.is_none() {
            return Ok(None);
        }
        self.ledger.list_participants(category_id).await.map(Some)
    }

    pub async fn remaining_votes(
        &self,
        identity: &str,
        category_id: i32,
    ) -> Result<u32, LedgerError> {
        self.limiter
            .remaining_for(&self.ledger, identity, category_id)
            .await
    }

    pub async fn audit_tallies(&self) -> Result<Vec<TallyDrift>, LedgerError> {
        self.ledger.audit_tallies().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::Queries;
    use crate::ledger::memory::MemoryLedger;
    use crate::limiter::RateLimiter;
    use crate::models::TallyDrift;

    fn fixture() -> (Queries<MemoryLedger>, MemoryLedger) {
        let ledger = MemoryLedger::new();
        ledger.add_category(3, "Zenith Award", "A", true);
        ledger.add_category(1, "Best Newcomer", "B", true);
        ledger.add_category(2, "Artist of the Year", "A", false);
        ledger.add_participant(10, 3, "Mara");
        ledger.add_participant(11, 3, "Anton");
        let limiter = RateLimiter::new(5, chrono_tz::UTC);
        (Queries::new(ledger.clone(), limiter), ledger)
    }

    #[rocket::async_test]
    async fn categories_ordered_by_batch_then_name() {
        let (queries, _) = fixture();

        let names: Vec<String> = queries
            .list_categories(None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(names, ["Artist of the Year", "Zenith Award", "Best Newcomer"]);
    }

    #[rocket::async_test]
    async fn batch_filter_restricts_listing() {
        let (queries, _) = fixture();

        let batches: Vec<String> = queries
            .list_categories(Some("A"))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.batch)
            .collect();

        assert_eq!(batches, ["A", "A"]);
    }

    #[rocket::async_test]
    async fn participants_ordered_by_name_with_live_tally() {
        let (queries, ledger) = fixture();
        ledger.seed_vote("203.0.113.7", 3, 10, Utc::now().naive_utc());

        let rows = queries.list_participants(3).await.unwrap().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Anton");
        assert_eq!(rows[1].name, "Mara");
        assert_eq!(rows[1].vote_count, 1);
    }

    #[rocket::async_test]
    async fn unknown_category_yields_none() {
        let (queries, _) = fixture();
        assert!(queries.list_participants(999).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn remaining_votes_is_idempotent() {
        let (queries, ledger) = fixture();
        ledger.seed_vote("203.0.113.7", 3, 10, Utc::now().naive_utc());

        let first = queries.remaining_votes("203.0.113.7", 3).await.unwrap();
        let second = queries.remaining_votes("203.0.113.7", 3).await.unwrap();

        assert_eq!(first, 4);
        assert_eq!(first, second);
    }

    #[rocket::async_test]
    async fn audit_flags_tally_drift() {
        let (queries, ledger) = fixture();
        assert!(queries.audit_tallies().await.unwrap().is_empty());

        ledger.corrupt_tally(10, 2);

        assert_eq!(
            queries.audit_tallies().await.unwrap(),
            vec![TallyDrift {
                participant_id: 10,
                vote_count: 2,
                ledger_count: 0,
            }]
        );
    }
}
