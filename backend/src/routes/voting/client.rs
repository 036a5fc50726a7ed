use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;

use crate::engine::{VoteEngine, VoteOutcome};
use crate::identity::VoterIdentity;
use crate::ledger::DbLedger;
use crate::models::{
    CastVoteRequest, CastVoteResponse, Category, Participant, RemainingVotesResponse,
};
use crate::queries::Queries;

// Route to list categories, optionally one batch
#[get("/categories?<batch>")]
pub async fn get_categories(
    queries: &State<Queries<DbLedger>>,
    batch: Option<&str>,
) -> Result<Json<Vec<Category>>, Status> {
    queries.list_categories(batch).await.map(Json).map_err(|e| {
        eprintln!("Error loading categories: {}", e);
        Status::InternalServerError
    })
}

// Route to list a category's participants with live vote counts
#[get("/categories/<category_id>/participants")]
pub async fn get_participants(
    queries: &State<Queries<DbLedger>>,
    category_id: i32,
) -> Result<Json<Vec<Participant>>, Status> {
    match queries.list_participants(category_id).await {
        Ok(Some(rows)) => Ok(Json(rows)),
        Ok(None) => Err(Status::NotFound),
        Err(e) => {
            eprintln!("Error loading participants: {}", e);
            Err(Status::InternalServerError)
        }
    }
}

// Route to report the caller's remaining votes for a category
#[get("/categories/<category_id>/remaining")]
pub async fn get_remaining(
    identity: VoterIdentity,
    queries: &State<Queries<DbLedger>>,
    category_id: i32,
) -> Result<Json<RemainingVotesResponse>, Status> {
    let remaining_votes = queries
        .remaining_votes(identity.as_str(), category_id)
        .await
        .map_err(|e| {
            eprintln!("Error counting votes: {}", e);
            Status::InternalServerError
        })?;

    Ok(Json(RemainingVotesResponse {
        category_id,
        remaining_votes,
    }))
}

// Route to cast a vote
#[post("/vote", format = "json", data = "<vote_request>")]
pub async fn cast_vote(
    identity: VoterIdentity,
    engine: &State<VoteEngine<DbLedger>>,
    vote_request: Json<CastVoteRequest>,
) -> Json<CastVoteResponse> {
    let outcome = engine
        .cast_vote(
            identity.as_str(),
            vote_request.category_id,
            vote_request.participant_id,
        )
        .await;

    Json(match outcome {
        VoteOutcome::Accepted { remaining_votes } => CastVoteResponse {
            accepted: true,
            remaining_votes,
            reason: None,
        },
        VoteOutcome::Rejected {
            reason,
            remaining_votes,
        } => CastVoteResponse {
            accepted: false,
            remaining_votes,
            reason: Some(reason.as_str()),
        },
    })
}
