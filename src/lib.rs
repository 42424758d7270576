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

//! Library of the Arena crate.
//!
//! # Description
//!
//! The arena shows two candidates picked at random, and the voter chooses the best one. Each vote updates
//! the Elo rating of both candidates, and the candidates are ranked by rating.
//!
//! Candidates live in memory, inside [CandidateCache], and the votes are written back to the DB in batches.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub mod cache;
pub mod candidates;
pub mod configuration;
pub mod elo;
pub mod errors;
pub mod locks;
pub mod telemetry;
pub mod votes;

// Bring all the endpoints to the main context.
pub mod endpoints {
    mod health;
    mod matchup;
    mod rankings;
    mod vote;

    pub use health::{HealthCheck, health};
    pub use matchup::{CandidateView, Matchup, matchup};
    pub use rankings::{RankedCandidate, rankings};
    pub use vote::{VoteRequest, vote};
}

pub use cache::{CandidateCache, WriteBack};
pub use candidates::{CandidateStore, MemoryCandidateStore, PgCandidateStore};
pub use votes::{Ballot, VoteProcessor};

/// Shared state of the HTTP handlers.
pub struct WebServerState<S: CandidateStore> {
    pub cache: Arc<CandidateCache<S>>,
    pub votes: VoteProcessor<S>,
}

impl<S: CandidateStore> WebServerState<S> {
    pub fn new(cache: Arc<CandidateCache<S>>, k_factor: f64) -> Self {
        WebServerState {
            votes: VoteProcessor::new(cache.clone(), k_factor),
            cache,
        }
    }
}

impl<S: CandidateStore> Clone for WebServerState<S> {
    fn clone(&self) -> Self {
        WebServerState {
            cache: self.cache.clone(),
            votes: self.votes.clone(),
        }
    }
}

/// Builds the router of the HTTP server.
pub fn app_router<S: CandidateStore>(state: WebServerState<S>) -> Router {
    Router::new()
        .route("/api/matchup", get(endpoints::matchup::<S>))
        .route("/api/vote", post(endpoints::vote::<S>))
        .route("/api/rankings", get(endpoints::rankings::<S>))
        .route("/health", get(endpoints::health))
        .with_state(state)
}
