// MySQL-backed ledger over the shared diesel-async connection pool.
//
// `record_vote` is the one write path. It runs at SERIALIZABLE so the
// in-window COUNT takes next-key locks on the (voter_identity, category_id,
// occurred_at) index range; two writers for the same identity and category
// conflict and one retries, while disjoint identities or categories lock
// disjoint ranges and proceed independently.

use chrono::NaiveDateTime;
use diesel::dsl::count;
use rocket_db_pools::diesel::MysqlPool;
use rocket_db_pools::diesel::prelude::*;
use scoped_futures::ScopedFutureExt;

use crate::limiter::DayWindow;
use crate::models::{Category, NewVoteEvent, Participant, TallyDrift};
use crate::schema::{categories, participants, vote_events};

use super::{Ledger, LedgerError, RecordOutcome};

#[derive(Clone)]
pub struct DbLedger {
    pool: MysqlPool,
}

impl DbLedger {
    pub fn new(pool: MysqlPool) -> Self {
        DbLedger { pool }
    }
}

fn pool_error<E: std::fmt::Display>(error: E) -> LedgerError {
    LedgerError::Unavailable(error.to_string())
}

fn map_store_error(error: diesel::result::Error) -> LedgerError {
    use diesel::result::{DatabaseErrorKind, Error};

    match error {
        Error::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => LedgerError::Conflict,
        // InnoDB reports deadlocks (1213) and lock wait timeouts (1205) with
        // this hint; both mean the transaction was rolled back whole.
        Error::DatabaseError(_, ref info) if info.message().contains("try restarting transaction") => {
            LedgerError::Conflict
        }
        other => LedgerError::Unavailable(other.to_string()),
    }
}

#[rocket::async_trait]
impl Ledger for DbLedger {
    async fn find_category(&self, id: i32) -> Result<Option<Category>, LedgerError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        categories::table
            .find(id)
            .first::<Category>(&mut conn)
            .await
            .optional()
            .map_err(map_store_error)
    }

    async fn find_participant(&self, id: i32) -> Result<Option<Participant>, LedgerError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        participants::table
            .find(id)
            .first::<Participant>(&mut conn)
            .await
            .optional()
            .map_err(map_store_error)
    }

    async fn list_categories(&self, batch: Option<&str>) -> Result<Vec<Category>, LedgerError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let mut query = categories::table.into_boxed();
        if let Some(batch) = batch {
            query = query.filter(categories::batch.eq(batch.to_string()));
        }
        query
            .order((categories::batch.asc(), categories::name.asc()))
            .load::<Category>(&mut conn)
            .await
            .map_err(map_store_error)
    }

    async fn list_participants(
        &self,
        category_id: i32,
    ) -> Result<Vec<Participant>, LedgerError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        participants::table
            .filter(participants::category_id.eq(category_id))
            .order(participants::name.asc())
            .load::<Participant>(&mut conn)
            .await
            .map_err(map_store_error)
    }

    async fn count_votes(
        &self,
        voter: &str,
        category_id: i32,
        window: &DayWindow,
    ) -> Result<i64, LedgerError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        vote_events::table
            .filter(vote_events::voter_identity.eq(voter))
            .filter(vote_events::category_id.eq(category_id))
            .filter(vote_events::occurred_at.ge(window.start_utc()))
            .filter(vote_events::occurred_at.lt(window.end_utc()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_store_error)
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
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let voter = voter.to_string();
        let (window_start, window_end) = (window.start_utc(), window.end_utc());

        // Applies to the next transaction on this connection only; read
        // paths stay at the default isolation level.
        diesel::sql_query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut conn)
            .await
            .map_err(map_store_error)?;

        conn.transaction::<RecordOutcome, diesel::result::Error, _>(|conn| {
            async move {
                let votes_today: i64 = vote_events::table
                    .filter(vote_events::voter_identity.eq(&voter))
                    .filter(vote_events::category_id.eq(category_id))
                    .filter(vote_events::occurred_at.ge(window_start))
                    .filter(vote_events::occurred_at.lt(window_end))
                    .count()
                    .get_result(conn)
                    .await?;

                if votes_today >= i64::from(limit) {
                    return Ok(RecordOutcome::LimitReached);
                }

                diesel::insert_into(vote_events::table)
                    .values(&NewVoteEvent {
                        voter_identity: voter.clone(),
                        category_id,
                        participant_id,
                        occurred_at,
                    })
                    .execute(conn)
                    .await?;

                diesel::update(participants::table.find(participant_id))
                    .set(participants::vote_count.eq(participants::vote_count + 1))
                    .execute(conn)
                    .await?;

                Ok(RecordOutcome::Accepted {
                    votes_today: votes_today + 1,
                })
            }
            .scope_boxed()
        })
        .await
        .map_err(map_store_error)
    }

    async fn audit_tallies(&self) -> Result<Vec<TallyDrift>, LedgerError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows: Vec<(i32, i32, i64)> = participants::table
            .left_join(vote_events::table)
            .group_by((participants::id, participants::vote_count))
            .select((
                participants::id,
                participants::vote_count,
                count(vote_events::id.nullable()),
            ))
            .load(&mut conn)
            .await
            .map_err(map_store_error)?;

        Ok(rows
            .into_iter()
            .filter(|(_, cached, actual)| i64::from(*cached) != *actual)
            .map(|(participant_id, cached, actual)| TallyDrift {
                participant_id,
                vote_count: cached.into(),
                ledger_count: actual,
            })
            .collect())
    }
}
