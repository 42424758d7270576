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

//! Module with the handler of the vote endpoint.
//!
//! # Description
//!
//! Votes are accepted right away and processed in the background, thus the response doesn't tell whether the
//! vote was counted. Votes for unknown candidates are logged and dropped.
//!
//! Example of vote:
//!
//! ```bash
//! curl -X POST 'http://localhost:1323/api/vote' \
//!   -H 'Content-Type: application/json' \
//!   -d '{"winnerID":1,"loserID":2}'
//! ```

use crate::{
    WebServerState,
    candidates::{CandidateId, CandidateStore},
    votes::Ballot,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct VoteRequest {
    #[serde(rename = "winnerID")]
    pub winner_id: CandidateId,
    #[serde(rename = "loserID")]
    pub loser_id: CandidateId,
}

pub async fn vote<S: CandidateStore>(
    State(state): State<WebServerState<S>>,
    Json(payload): Json<VoteRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    info!(
        "Vote received: {} beat {}",
        payload.winner_id, payload.loser_id
    );

    // Dropping the handle detaches the task. The outcome of the vote is only logged.
    drop(
        state
            .votes
            .submit(Ballot::new(payload.winner_id, payload.loser_id)),
    );

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "accepted",
        })),
    )
}
