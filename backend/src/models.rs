use chrono::NaiveDateTime;
use rocket::serde::{Deserialize, Serialize};
use rocket_db_pools::diesel::prelude::*;

use crate::schema::{admin_sessions, categories, participants, vote_events};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub batch: String,
    pub is_active: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub name: String,
    pub batch: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = participants)]
pub struct Participant {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub image_url: Option<String>,
    pub vote_count: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = participants)]
pub struct NewParticipant {
    pub category_id: i32,
    pub name: String,
}

/// A single accepted vote. Rows are append-only: never updated, never deleted.
#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = vote_events)]
pub struct VoteEvent {
    pub id: i64,
    pub voter_identity: String,
    pub category_id: i32,
    pub participant_id: i32,
    pub occurred_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = vote_events)]
pub struct NewVoteEvent {
    pub voter_identity: String,
    pub category_id: i32,
    pub participant_id: i32,
    pub occurred_at: NaiveDateTime,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = admin_sessions)]
pub struct AdminSession {
    pub session_token: String,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = admin_sessions)]
pub struct NewAdminSession {
    pub session_token: String,
    pub expires_at: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CastVoteRequest {
    pub category_id: i32,
    pub participant_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CastVoteResponse {
    pub accepted: bool,
    pub remaining_votes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct RemainingVotesResponse {
    pub category_id: i32,
    pub remaining_votes: u32,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SetCategoryActiveRequest {
    pub active: bool,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DashboardStats {
    pub total_categories: i64,
    pub active_categories: i64,
    pub batch_a_categories: i64,
    pub batch_b_categories: i64,
    pub total_participants: i64,
    pub total_votes: i64,
}

/// One participant whose cached tally disagrees with the vote log.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TallyDrift {
    pub participant_id: i32,
    pub vote_count: i64,
    pub ledger_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AuditReport {
    pub participants_checked: i64,
    pub drift: Vec<TallyDrift>,
}
