//! Reconciliation handlers

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::auth::Claims;
use crate::dto::reconciliation::{MatchQuery, MatchResponse};
use crate::error::ApiError;
use crate::AppState;

const DEFAULT_MATCH_LIMIT: usize = 20;

/// Advisory match suggestions for unclaimed bank transactions
pub async fn find_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<Vec<MatchResponse>>, ApiError> {
    let therapist_id = claims.therapist_id()?;
    let limit = query.limit.unwrap_or(DEFAULT_MATCH_LIMIT);

    let matches = state
        .reconciliation
        .find_potential_matches(therapist_id, query.start, query.end, limit)
        .await?;
    Ok(Json(matches.into_iter().map(Into::into).collect()))
}
