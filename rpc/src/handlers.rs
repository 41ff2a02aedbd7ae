//! HTTP request handlers and their wire types.
//!
//! Weights travel as decimal strings (`"35.5"`) so no client loses
//! precision; timestamps are milliseconds since the Unix epoch.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use ballast_ledger::VoteSubmission;
use ballast_query::{PriceSource, TallyView};
use ballast_reweigh::BatchReport;
use ballast_store::LedgerStore;
use ballast_types::{Proposal, ProposalId, Vote, VoterCounts, WalletAddress};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::pagination::{encode_cursor, PaginationParams};
use crate::server::{ApiState, ADMIN_KEY_HEADER};

type AppState<S> = State<Arc<ApiState<S>>>;

// ── Votes ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    pub proposal_id: String,
    pub wallet_address: String,
    pub chosen_option: String,
    /// `0x`-prefixed hex.
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: u64,
    pub proposal_id: u64,
    pub wallet: String,
    pub option: String,
    pub weight: String,
    pub chain_id: u64,
    pub signature: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<&Vote> for VoteResponse {
    fn from(v: &Vote) -> Self {
        Self {
            id: v.id.get(),
            proposal_id: v.proposal_id.get(),
            wallet: v.wallet.to_string(),
            option: v.option.clone(),
            weight: v.weight.to_string(),
            chain_id: v.chain_id.get(),
            signature: format!("0x{}", hex::encode(&v.signature)),
            created_at: v.created_at.as_millis(),
            updated_at: v.updated_at.as_millis(),
        }
    }
}

/// `POST /api/votes`
pub async fn submit_vote<S: LedgerStore + 'static>(
    State(state): AppState<S>,
    body: Result<Json<SubmitVoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, RpcError> {
    let Json(request) = body.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    let submission = VoteSubmission {
        proposal_id: parse_proposal(&request.proposal_id)?,
        wallet: parse_wallet(&request.wallet_address)?,
        option: request.chosen_option,
        signature: parse_signature(&request.signature)?,
    };

    match state.ledger.submit_vote(submission).await {
        Ok(vote) => {
            state.metrics.vote_accepted();
            Ok((StatusCode::CREATED, Json(VoteResponse::from(&vote))))
        }
        Err(e) => {
            state.metrics.vote_rejected(e.kind());
            Err(e.into())
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentVotesResponse {
    pub proposal_id: u64,
    pub votes: Vec<VoteResponse>,
    pub total_voters: u64,
    pub voters_per_option: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// `GET /api/votes/:proposal?cursor=&limit=`
pub async fn recent_votes<S: LedgerStore + 'static>(
    State(state): AppState<S>,
    Path(proposal): Path<String>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<RecentVotesResponse>, RpcError> {
    let proposal_id = parse_proposal(&proposal)?;
    let recent = state
        .query
        .recent_votes(proposal_id, page.decode_offset(), page.limit)?;
    let VoterCounts { total, per_option } = recent.counts;
    Ok(Json(RecentVotesResponse {
        proposal_id: proposal_id.get(),
        votes: recent.votes.iter().map(VoteResponse::from).collect(),
        total_voters: total,
        voters_per_option: per_option,
        cursor: recent.next_offset.map(|o| encode_cursor(o as u64)),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletVoteResponse {
    pub proposal_id: u64,
    pub wallet: String,
    pub option: Option<String>,
    pub weight: Option<String>,
}

/// `GET /api/votes/:proposal/:wallet`
pub async fn wallet_vote<S: LedgerStore + 'static>(
    State(state): AppState<S>,
    Path((proposal, wallet)): Path<(String, String)>,
) -> Result<Json<WalletVoteResponse>, RpcError> {
    let proposal_id = parse_proposal(&proposal)?;
    let wallet = parse_wallet(&wallet)?;
    let found = state.query.wallet_vote(proposal_id, &wallet)?;
    Ok(Json(WalletVoteResponse {
        proposal_id: proposal_id.get(),
        wallet: wallet.to_string(),
        option: found.vote.as_ref().map(|v| v.option.clone()),
        weight: found.vote.as_ref().map(|v| v.weight.to_string()),
    }))
}

// ── Aggregate ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    pub proposal_id: u64,
    pub description: String,
    pub totals: BTreeMap<String, String>,
    pub voters: BTreeMap<String, u64>,
    pub total_weight: String,
    pub last_updated_at: u64,
    pub display_value: f64,
    pub price: f64,
    pub price_source: PriceSource,
}

impl From<TallyView> for AggregateResponse {
    fn from(view: TallyView) -> Self {
        Self {
            proposal_id: view.proposal.id.get(),
            description: view.proposal.description,
            totals: view
                .tally
                .totals
                .iter()
                .map(|(option, weight)| (option.clone(), weight.to_string()))
                .collect(),
            voters: view.tally.voters,
            total_weight: view.total_weight.to_string(),
            last_updated_at: view.tally.last_updated_at.as_millis(),
            display_value: view.display_value,
            price: view.price.price,
            price_source: view.price.source,
        }
    }
}

/// `GET /api/aggregate/:proposal`
pub async fn aggregate<S: LedgerStore + 'static>(
    State(state): AppState<S>,
    Path(proposal): Path<String>,
) -> Result<Json<AggregateResponse>, RpcError> {
    let view = state.query.tally(parse_proposal(&proposal)?).await?;
    if view.price.source != PriceSource::Live {
        state.metrics.price_fallback();
    }
    Ok(Json(view.into()))
}

// ── Admin ────────────────────────────────────────────────────────────────

fn require_admin<S>(state: &ApiState<S>, headers: &HeaderMap) -> Result<(), RpcError> {
    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    match (&state.admin_key, presented) {
        (Some(expected), Some(given)) if !expected.is_empty() && expected == given => Ok(()),
        _ => Err(RpcError::Unauthorized),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub description: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalResponse {
    pub id: u64,
    pub description: String,
    pub options: Vec<String>,
    pub created_at: u64,
}

impl From<Proposal> for ProposalResponse {
    fn from(p: Proposal) -> Self {
        Self {
            id: p.id.get(),
            description: p.description,
            options: p.options,
            created_at: p.created_at.as_millis(),
        }
    }
}

/// `POST /api/admin/proposals`
pub async fn create_proposal<S: LedgerStore + 'static>(
    State(state): AppState<S>,
    headers: HeaderMap,
    body: Result<Json<CreateProposalRequest>, JsonRejection>,
) -> Result<impl IntoResponse, RpcError> {
    require_admin(&state, &headers)?;
    let Json(request) = body.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    let proposal = state
        .ledger
        .create_proposal(&request.description, &request.options)
        .await?;
    Ok((StatusCode::CREATED, Json(ProposalResponse::from(proposal))))
}

/// `POST /api/admin/votes/update` runs one reweigh batch.
pub async fn run_reweigh<S: LedgerStore + 'static>(
    State(state): AppState<S>,
    headers: HeaderMap,
) -> Result<Json<BatchReport>, RpcError> {
    require_admin(&state, &headers)?;
    let report = state.reweigh.run_batch().await?;
    state.metrics.reweigh_batch(&report);
    Ok(Json(report))
}

// ── Service ──────────────────────────────────────────────────────────────

/// `GET /metrics`
pub async fn metrics<S: LedgerStore + 'static>(State(state): AppState<S>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Parsing ──────────────────────────────────────────────────────────────

fn parse_proposal(raw: &str) -> Result<ProposalId, RpcError> {
    raw.parse()
        .map_err(|_| RpcError::InvalidRequest(format!("bad proposal id '{raw}'")))
}

fn parse_wallet(raw: &str) -> Result<WalletAddress, RpcError> {
    raw.parse()
        .map_err(|_| RpcError::InvalidRequest(format!("bad wallet address '{raw}'")))
}

fn parse_signature(raw: &str) -> Result<Vec<u8>, RpcError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|_| RpcError::InvalidRequest("signature is not hex".into()))
}
