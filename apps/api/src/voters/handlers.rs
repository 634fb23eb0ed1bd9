//! Axum route handlers for the Voters API.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::state::AppState;
use crate::voters::models::{VoterField, VoterFilter, VoterRecord};

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FacetsResponse {
    pub party_id: Vec<String>,
    pub ideology: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VoterSampleResponse {
    /// Records matching the filter, before eligibility and sampling.
    pub total_matching: usize,
    pub voters: Vec<VoterRecord>,
}

/// Parsed form of `?party_id=a,b&ideology=c&sample_size=3&seed=7`.
#[derive(Debug, Default, PartialEq)]
pub struct VoterQuery {
    pub filter: VoterFilter,
    pub sample_size: Option<i64>,
    pub seed: Option<u64>,
}

impl VoterQuery {
    /// Any key other than `sample_size` / `seed` must name a categorical column.
    /// Comma-separated values form that column's allowed set; an empty value
    /// (`?party_id=`) leaves the column unconstrained. Values that themselves
    /// contain commas cannot be expressed here; use the JSON `filters` body of
    /// `POST /api/v1/reactions` for those.
    pub fn parse(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut query = VoterQuery::default();

        for (key, raw) in params {
            match key.as_str() {
                "sample_size" => {
                    query.sample_size = Some(raw.trim().parse().map_err(|_| {
                        AppError::Validation(format!("sample_size must be an integer, got '{raw}'"))
                    })?);
                }
                "seed" => {
                    query.seed = Some(raw.trim().parse().map_err(|_| {
                        AppError::Validation(format!(
                            "seed must be a non-negative integer, got '{raw}'"
                        ))
                    })?);
                }
                column => {
                    let field = VoterField::from_column(column).ok_or_else(|| {
                        AppError::Validation(format!("Unknown filter field '{column}'"))
                    })?;
                    let values: Vec<&str> = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .collect();
                    if !values.is_empty() {
                        query.filter = std::mem::take(&mut query.filter).allow(field, values);
                    }
                }
            }
        }

        Ok(query)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/voters/facets
///
/// Distinct party and ideology values, for building filter pickers.
pub async fn handle_facets(State(state): State<AppState>) -> Result<Json<FacetsResponse>, AppError> {
    let store = state.voters.get().await?;

    Ok(Json(FacetsResponse {
        party_id: store.facets(VoterField::PartyId),
        ideology: store.facets(VoterField::Ideology),
    }))
}

/// GET /api/v1/voters
///
/// Filters the voter file and returns a random sample of eligible voters.
pub async fn handle_sample_voters(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<VoterSampleResponse>, AppError> {
    let query = VoterQuery::parse(&params)?;
    let store = state.voters.get().await?;

    let total_matching = store.filter(&query.filter).len();
    let voters = store.query(
        &query.filter,
        query.sample_size.unwrap_or(state.config.default_sample_size),
        query.seed,
    )?;

    Ok(Json(VoterSampleResponse {
        total_matching,
        voters,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_filters_and_sampling() {
        let query = VoterQuery::parse(&params(&[
            ("party_id", "Democrat, Independent"),
            ("ideology", "Liberal"),
            ("sample_size", "5"),
            ("seed", "99"),
        ]))
        .unwrap();

        assert_eq!(
            query.filter,
            VoterFilter::new()
                .allow(VoterField::PartyId, ["Democrat", "Independent"])
                .allow(VoterField::Ideology, ["Liberal"])
        );
        assert_eq!(query.sample_size, Some(5));
        assert_eq!(query.seed, Some(99));
    }

    #[test]
    fn test_parse_rejects_unknown_fields_and_bad_numbers() {
        assert!(VoterQuery::parse(&params(&[("favourite_color", "blue")])).is_err());
        assert!(VoterQuery::parse(&params(&[("sample_size", "three")])).is_err());
        assert!(VoterQuery::parse(&params(&[("seed", "-4")])).is_err());
    }

    #[test]
    fn test_empty_filter_value_means_unconstrained() {
        let query = VoterQuery::parse(&params(&[("party_id", ""), ("ideology", " , ")])).unwrap();
        assert_eq!(query.filter, VoterFilter::new());
    }

    #[test]
    fn test_negative_sample_size_parses_and_is_rejected_later() {
        let query = VoterQuery::parse(&params(&[("sample_size", "-1")])).unwrap();
        assert_eq!(query.sample_size, Some(-1));
    }
}
