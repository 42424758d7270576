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

//! Module with the handler of the rankings endpoint.
//!
//! # Description
//!
//! The ranking may be a few seconds old: it is refreshed at most once per ranking refresh interval.

use crate::{
    WebServerState,
    candidates::{CandidateId, CandidateRecord, CandidateStore},
    errors::ApiError,
};
use axum::{Json, extract::State};
use serde::Serialize;
use tracing::error;

/// Entry of the ranking. Positions start at 1 and ratings are truncated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub id: CandidateId,
    pub name: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub rating: i64,
    pub wins: u64,
    pub losses: u64,
}

impl RankedCandidate {
    fn new(rank: usize, record: &CandidateRecord) -> Self {
        RankedCandidate {
            rank,
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            image: record.image.clone(),
            link: record.link.clone(),
            rating: record.rating as i64,
            wins: record.wins,
            losses: record.losses,
        }
    }
}

pub async fn rankings<S: CandidateStore>(
    State(state): State<WebServerState<S>>,
) -> Result<Json<Vec<RankedCandidate>>, ApiError> {
    let ranking = state.cache.ranked().await.map_err(|e| {
        error!("Failed to retrieve the ranking: {e}");
        ApiError::from(e)
    })?;

    Ok(Json(
        ranking
            .iter()
            .enumerate()
            .map(|(i, record)| RankedCandidate::new(i + 1, record))
            .collect(),
    ))
}
