// In-memory ledger for tests. One mutex serializes every operation, so each
// call behaves like its own serializable transaction; injection hooks
// simulate the failure modes the engine has to survive.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;

use crate::limiter::DayWindow;
use crate::models::{Category, Participant, TallyDrift, VoteEvent};

use super::{Ledger, LedgerError, RecordOutcome};

#[derive(Default)]
struct MemoryState {
    categories: BTreeMap<i32, Category>,
    participants: BTreeMap<i32, Participant>,
    events: Vec<VoteEvent>,
    next_event_id: i64,
    conflicts_to_inject: u32,
    fail_after_insert: bool,
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, id: i32, name: &str, batch: &str, is_active: bool) {
        let mut st = self.state.lock().unwrap();
        st.categories.insert(
            id,
            Category {
                id,
                name: name.to_string(),
                batch: batch.to_string(),
                is_active,
                image_url: None,
            },
        );
    }

    pub fn add_participant(&self, id: i32, category_id: i32, name: &str) {
        let mut st = self.state.lock().unwrap();
        st.participants.insert(
            id,
            Participant {
                id,
                category_id,
                name: name.to_string(),
                image_url: None,
                vote_count: 0,
            },
        );
    }

    /// Seed a prior accepted vote: event row plus tally increment, the way a
    /// committed transaction would have left them.
    pub fn seed_vote(
        &self,
        voter: &str,
        category_id: i32,
        participant_id: i32,
        occurred_at: NaiveDateTime,
    ) {
        let mut st = self.state.lock().unwrap();
        st.next_event_id += 1;
        let id = st.next_event_id;
        st.events.push(VoteEvent {
            id,
            voter_identity: voter.to_string(),
            category_id,
            participant_id,
            occurred_at,
        });
        st.participants
            .get_mut(&participant_id)
            .expect("seeded participant")
            .vote_count += 1;
    }

    /// The next `n` record_vote calls fail with a retryable conflict.
    pub fn inject_conflicts(&self, n: u32) {
        self.state.lock().unwrap().conflicts_to_inject = n;
    }

    /// The next record_vote fails after the event insert, before the
    /// increment; the whole transaction rolls back.
    pub fn fail_after_next_insert(&self) {
        self.state.lock().unwrap().fail_after_insert = true;
    }

    /// Corrupt a cached tally directly, bypassing the ledger. Only the audit
    /// should ever notice this.
    pub fn corrupt_tally(&self, participant_id: i32, delta: i32) {
        let mut st = self.state.lock().unwrap();
        st.participants
            .get_mut(&participant_id)
            .expect("participant")
            .vote_count += delta;
    }

    pub fn event_count(&self) -> usize {
        self.state.lock().unwrap().events.len()
    }

    pub fn tally_of(&self, participant_id: i32) -> i32 {
        self.state.lock().unwrap().participants[&participant_id].vote_count
    }

    pub fn events_for(&self, participant_id: i32) -> usize {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.participant_id == participant_id)
            .count()
    }
}

#[rocket::async_trait]
impl Ledger for MemoryLedger {
    async fn find_category(&self, id: i32) -> Result<Option<Category>, LedgerError> {
        Ok(self.state.lock().unwrap().categories.get(&id).cloned())
    }

    async fn find_participant(&self, id: i32) -> Result<Option<Participant>, LedgerError> {
        Ok(self.state.lock().unwrap().participants.get(&id).cloned())
    }

    async fn list_categories(&self, batch: Option<&str>) -> Result<Vec<Category>, LedgerError> {
        let st = self.state.lock().unwrap();
        let mut rows: Vec<Category> = st
            .categories
            .values()
            .filter(|c| batch.map_or(true, |b| c.batch == b))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.batch, &a.name).cmp(&(&b.batch, &b.name)));
        Ok(rows)
    }

    async fn list_participants(
        &self,
        category_id: i32,
    ) -> Result<Vec<Participant>, LedgerError> {
        let st = self.state.lock().unwrap();
        let mut rows: Vec<Participant> = st
            .participants
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn count_votes(
        &self,
        voter: &str,
        category_id: i32,
        window: &DayWindow,
    ) -> Result<i64, LedgerError> {
        let st = self.state.lock().unwrap();
        Ok(st
            .events
            .iter()
            .filter(|e| {
                e.voter_identity == voter
                    && e.category_id == category_id
                    && window.contains(e.occurred_at)
            })
            .count() as i64)
    }

    async fn record_vote(
        &self,
        voter: &str,
        category_id: i32,
        participant_id: i32,
        window: &DayWindow,
        limit: u32,
        occurred_at: NaiveDateTime,
    ) -> Result<RecordOutcome, LedgerError> {
        let mut st = self.state.lock().unwrap();

        if st.conflicts_to_inject > 0 {
            st.conflicts_to_inject -= 1;
            return Err(LedgerError::Conflict);
        }

        let votes_today = st
            .events
            .iter()
            .filter(|e| {
                e.voter_identity == voter
                    && e.category_id == category_id
                    && window.contains(e.occurred_at)
            })
            .count() as i64;

        if votes_today >= i64::from(limit) {
            return Ok(RecordOutcome::LimitReached);
        }

        if st.fail_after_insert {
            st.fail_after_insert = false;
            // Stage the insert as an open transaction would, then discard
            // the staged state: the rollback leaves neither the event nor
            // the increment behind.
            let mut staged = st.events.clone();
            staged.push(VoteEvent {
                id: st.next_event_id + 1,
                voter_identity: voter.to_string(),
                category_id,
                participant_id,
                occurred_at,
            });
            drop(staged);
            return Err(LedgerError::Unavailable(
                "injected failure between insert and increment".to_string(),
            ));
        }

        st.next_event_id += 1;
        let id = st.next_event_id;
        st.events.push(VoteEvent {
            id,
            voter_identity: voter.to_string(),
            category_id,
            participant_id,
            occurred_at,
        });
        st.participants
            .get_mut(&participant_id)
            .ok_or_else(|| LedgerError::Unavailable("unknown participant".to_string()))?
            .vote_count += 1;

        Ok(RecordOutcome::Accepted {
            votes_today: votes_today + 1,
        })
    }

    async fn audit_tallies(&self) -> Result<Vec<TallyDrift>, LedgerError> {
        let st = self.state.lock().unwrap();
        Ok(st
            .participants
            .values()
            .filter_map(|p| {
                let actual = st
                    .events
                    .iter()
                    .filter(|e| e.participant_id == p.id)
                    .count() as i64;
                if i64::from(p.vote_count) != actual {
                    Some(TallyDrift {
                        participant_id: p.id,
                        vote_count: p.vote_count.into(),
                        ledger_count: actual,
                    })
                } else {
                    None
                }
            })
            .collect())
    }
}
