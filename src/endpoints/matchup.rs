// Copyright 2025 Felipe Torres González
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

//! Module with the handler of the matchup endpoint.
//!
//! # Description
//!
//! A matchup is a pair of different candidates picked at random, to be shown to the voter. Example:
//!
//! ```bash
//! curl 'http://localhost:1323/api/matchup'
//! ```

use crate::{
    WebServerState,
    candidates::{Candidate, CandidateId, CandidateStore},
    errors::{ApiError, CacheError},
};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

/// Descriptive attributes of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateView {
    pub id: CandidateId,
    pub name: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Candidate> for CandidateView {
    fn from(value: &Candidate) -> Self {
        CandidateView {
            id: value.id(),
            name: value.name().to_owned(),
            description: value.description().to_owned(),
            image: value.image().to_owned(),
            link: value.link().to_owned(),
            created_at: value.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matchup {
    pub left: CandidateView,
    pub right: CandidateView,
}

pub async fn matchup<S: CandidateStore>(
    State(state): State<WebServerState<S>>,
) -> Result<Json<Matchup>, ApiError> {
    let pair = state.cache.random(2).await.map_err(|e| {
        error!("Failed to pick a matchup: {e}");
        match e {
            // Fewer than two candidates is a deployment problem, not a bad request.
            CacheError::InvalidArgument { .. } => ApiError::InternalServerError,
            e => ApiError::from(e),
        }
    })?;

    match pair.as_slice() {
        [left, right] => {
            debug!("Matchup: {} vs {}", left.name(), right.name());
            Ok(Json(Matchup {
                left: CandidateView::from(left.as_ref()),
                right: CandidateView::from(right.as_ref()),
            }))
        }
        _ => {
            error!("Expected 2 candidates, got {}", pair.len());
            Err(ApiError::InternalServerError)
        }
    }
}
