// Vote engine: orchestrates one cast-vote attempt.
//
// Validation happens before any transaction; the limit check, the event
// insert and the tally increment happen together inside one ledger
// transaction. Serialization conflicts are retried a bounded number of
// times, then reported as transient so the caller can retry the user action
// without assuming the limit was hit.

use chrono::Utc;
use rocket::tokio::time::{Duration, sleep, timeout};

use crate::ledger::{Ledger, LedgerError, RecordOutcome};
use crate::limiter::RateLimiter;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_STEP: Duration = Duration::from_millis(25);
// An attempt that cannot reach the store in this time fails closed.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Category missing or inactive, participant missing or in another
    /// category. User error; not retried.
    InvalidTarget,
    /// The daily ceiling for this identity and category is spent.
    LimitExceeded,
    /// Store unavailable or conflict retries exhausted. Safe to retry.
    TransientError,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InvalidTarget => "invalid_target",
            RejectReason::LimitExceeded => "limit_exceeded",
            RejectReason::TransientError => "transient_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Accepted { remaining_votes: u32 },
    Rejected { reason: RejectReason, remaining_votes: u32 },
}

pub struct VoteEngine<L> {
    ledger: L,
    limiter: RateLimiter,
}

impl<L: Ledger> VoteEngine<L> {
    pub fn new(ledger: L, limiter: RateLimiter) -> Self {
        VoteEngine { ledger, limiter }
    }

    pub async fn cast_vote(
        &self,
        identity: &str,
        category_id: i32,
        participant_id: i32,
    ) -> VoteOutcome {
        // Target validation runs before any transaction is opened.
        match self.ledger.find_category(category_id).await {
            Ok(Some(category)) if category.is_active => {}
            Ok(_) => return rejected(RejectReason::InvalidTarget),
            Err(e) => {
                eprintln!("Error validating category {}: {}", category_id, e);
                return rejected(RejectReason::TransientError);
            }
        }
        match self.ledger.find_participant(participant_id).await {
            Ok(Some(participant)) if participant.category_id == category_id => {}
            Ok(_) => return rejected(RejectReason::InvalidTarget),
            Err(e) => {
                eprintln!("Error validating participant {}: {}", participant_id, e);
                return rejected(RejectReason::TransientError);
            }
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let now = Utc::now();
            let window = self.limiter.window_containing(now);

            let record = timeout(
                ATTEMPT_TIMEOUT,
                self.ledger.record_vote(
                    identity,
                    category_id,
                    participant_id,
                    &window,
                    self.limiter.limit(),
                    now.naive_utc(),
                ),
            )
            .await;

            match record {
                Ok(Ok(RecordOutcome::Accepted { votes_today })) => {
                    return VoteOutcome::Accepted {
                        remaining_votes: self.limiter.remaining_after(votes_today),
                    };
                }
                Ok(Ok(RecordOutcome::LimitReached)) => {
                    return rejected(RejectReason::LimitExceeded);
                }
                Ok(Err(LedgerError::Conflict)) => {
                    if attempt < MAX_ATTEMPTS {
                        sleep(BACKOFF_STEP * attempt).await;
                    }
                }
                Ok(Err(LedgerError::Unavailable(msg))) => {
                    eprintln!("Error recording vote: {}", msg);
                    return rejected(RejectReason::TransientError);
                }
                Err(_elapsed) => {
                    eprintln!(
                        "Vote attempt for {} in category {} timed out",
                        identity, category_id
                    );
                    return rejected(RejectReason::TransientError);
                }
            }
        }

        rejected(RejectReason::TransientError)
    }
}

fn rejected(reason: RejectReason) -> VoteOutcome {
    // Fail closed: a rejection never reports remaining allowance.
    VoteOutcome::Rejected {
        reason,
        remaining_votes: 0,
    }
}
