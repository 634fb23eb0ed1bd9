//! Axum route handlers for the Reactions API.

use anyhow::anyhow;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::reactions::models::ReactionResult;
use crate::state::AppState;
use crate::voters::models::{VoterFilter, VoterRecord};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReactionsRequest {
    pub speech: String,
    #[serde(default)]
    pub filters: VoterFilter,
    pub sample_size: Option<i64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct VoterReaction {
    pub voter: VoterRecord,
    pub reaction: ReactionResult,
    /// Reaction text, or a placeholder when generation failed.
    pub display: String,
}

#[derive(Debug, Serialize)]
pub struct ReactionsResponse {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<VoterReaction>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/reactions
///
/// Samples voters matching `filters` and simulates each one's reaction to `speech`.
/// Individual generation failures are reported inline and never fail the request.
///
/// The batch runs on its own task. If the client disconnects, the drop guard
/// cancels it: no new LLM calls are issued, in-flight ones finish.
pub async fn handle_generate_reactions(
    State(state): State<AppState>,
    Json(request): Json<ReactionsRequest>,
) -> Result<Json<ReactionsResponse>, AppError> {
    if request.speech.trim().is_empty() {
        return Err(AppError::Validation("speech cannot be empty".to_string()));
    }

    let store = state.voters.get().await?;
    let voters = store.query(
        &request.filters,
        request
            .sample_size
            .unwrap_or(state.config.default_sample_size),
        request.seed,
    )?;

    let run_id = Uuid::new_v4();
    info!("Reaction run {} started for {} voters", run_id, voters.len());

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let generator = state.reactions.clone();
    let speech = request.speech;
    let batch_voters = voters.clone();
    let reactions = tokio::spawn(async move {
        generator
            .generate_batch(&speech, &batch_voters, &cancel)
            .await
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("Reaction batch {run_id} failed: {e}")))?;

    let failed = reactions.iter().filter(|r| r.is_failed()).count();
    info!(
        "Reaction run {} finished: {} ok, {} failed",
        run_id,
        reactions.len() - failed,
        failed
    );

    let results = voters
        .into_iter()
        .zip(reactions)
        .map(|(voter, reaction)| VoterReaction {
            display: reaction.display_text().to_string(),
            voter,
            reaction,
        })
        .collect();

    Ok(Json(ReactionsResponse {
        run_id,
        generated_at: Utc::now(),
        results,
    }))
}
