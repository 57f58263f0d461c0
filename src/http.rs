//! HTTP API.
//!
//! Thin wrappers over [`VoteManager`]: decode the request, call the
//! manager, shape the JSON response. Method mismatches get a 405 from the
//! method routers; malformed JSON bodies map to 400.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::common::{Error, Result};
use crate::manager::{CastOutcome, VoteManager};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<VoteManager>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/create_vote", post(create_vote))
        .route("/vote", post(cast_vote))
        .route("/vote_result", get(vote_result))
        .route("/delete_all_voters", delete(delete_all_voters))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateVoteRequest {
    voter_id: String,
    options: Vec<String>,
    user_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CastVoteRequest {
    vote_id: String,
    email: String,
    option: String,
}

#[derive(Debug, Deserialize)]
struct ResultParams {
    vote_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct TallyResponse {
    results: HashMap<String, i64>,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

async fn create_vote(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateVoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(|e| Error::InvalidInput(e.to_string()))?;
    state
        .manager
        .create_session(&req.voter_id, &req.options, &req.user_list)
        .await?;
    Ok((StatusCode::CREATED, message("Vote created and emails sent")))
}

async fn cast_vote(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CastVoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(|e| Error::InvalidInput(e.to_string()))?;
    let outcome = state
        .manager
        .cast_vote(&req.vote_id, &req.email, &req.option)
        .await?;
    let text = match outcome {
        CastOutcome::Recorded => "Your vote is recorded",
        CastOutcome::AlreadyVoted => "Your vote is already recorded, you can't vote again",
    };
    Ok(message(text))
}

async fn vote_result(
    State(state): State<AppState>,
    Query(params): Query<ResultParams>,
) -> Result<impl IntoResponse> {
    let vote_id = params
        .vote_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidInput("Missing vote_id parameter".to_string()))?;
    let results = state.manager.tally(&vote_id).await?;
    Ok(Json(TallyResponse { results }))
}

async fn delete_all_voters(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let removed = state.manager.delete_all().await?;
    Ok(format!("Deleted {removed} rows from voters table"))
}
