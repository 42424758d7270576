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

//! Module with the processing of the votes.
//!
//! # Description
//!
//! A vote is accepted as soon as it is received, and processed in the background. Processing a vote goes
//! through these steps:
//!
//! 1. The ballot is validated: both IDs must be different and known by the cache.
//! 2. The locks of both candidates are taken.
//! 3. The new ratings are computed from the current ones and written to the managed instances.
//! 4. The cache is notified, which marks both candidates as dirty and might write them back.
//! 5. The locks are released.
//!
//! A vote that fails any step is logged and dropped. Validation errors leave both candidates untouched.
//!
//! Creating a candidate reloads the cache. Votes notified before the reload are written back first, but a vote
//! caught between steps 3 and 4 updated instances the cache no longer manages: the notification is refused with
//! [crate::errors::CacheError::StaleReference] and that vote is lost.

use crate::{
    cache::{CandidateCache, WriteBack},
    candidates::{CandidateId, CandidateStore},
    elo::apply_outcome,
    errors::VoteError,
    locks::CandidateLocks,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Outcome of a match between two candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ballot {
    pub winner: CandidateId,
    pub loser: CandidateId,
}

impl Ballot {
    pub fn new(winner: CandidateId, loser: CandidateId) -> Self {
        Ballot { winner, loser }
    }
}

pub struct VoteProcessor<S: CandidateStore> {
    cache: Arc<CandidateCache<S>>,
    locks: Arc<CandidateLocks>,
    k_factor: f64,
}

impl<S: CandidateStore> Clone for VoteProcessor<S> {
    fn clone(&self) -> Self {
        VoteProcessor {
            cache: self.cache.clone(),
            locks: self.locks.clone(),
            k_factor: self.k_factor,
        }
    }
}

impl<S: CandidateStore> VoteProcessor<S> {
    pub fn new(cache: Arc<CandidateCache<S>>, k_factor: f64) -> Self {
        VoteProcessor {
            cache,
            locks: Arc::new(CandidateLocks::new()),
            k_factor,
        }
    }

    /// Accepts a vote and processes it in a background task.
    ///
    /// # Description
    ///
    /// The method returns right away. The returned handle can be awaited to get the outcome of the vote, or
    /// dropped; the vote is processed anyway. Failures are logged.
    pub fn submit(&self, ballot: Ballot) -> JoinHandle<Result<WriteBack, VoteError>> {
        let processor = self.clone();

        tokio::spawn(async move {
            let outcome = processor.process(ballot).await;
            if let Err(e) = &outcome {
                warn!(
                    "Vote {} over {} dropped: {e}",
                    ballot.winner, ballot.loser
                );
            }
            outcome
        })
    }

    /// Applies a vote to the ratings of the candidates.
    #[instrument(name = "Process a vote", skip(self))]
    pub async fn process(&self, ballot: Ballot) -> Result<WriteBack, VoteError> {
        if ballot.winner == ballot.loser {
            return Err(VoteError::MalformedBallot(format!(
                "candidate {} can't beat itself",
                ballot.winner
            )));
        }

        let winner = self
            .cache
            .get(ballot.winner)
            .await?
            .ok_or(VoteError::UnknownCandidate(ballot.winner))?;
        let loser = self
            .cache
            .get(ballot.loser)
            .await?
            .ok_or(VoteError::UnknownCandidate(ballot.loser))?;

        let (_winner_guard, _loser_guard) = self.locks.acquire_pair(winner.id(), loser.id()).await;

        let (winner_standing, loser_standing) = apply_outcome(
            winner.standing().await,
            loser.standing().await,
            self.k_factor,
        );
        winner.set_standing(winner_standing).await;
        loser.set_standing(loser_standing).await;

        debug!(
            "{} ({:.1}) beat {} ({:.1})",
            winner.name(),
            winner_standing.rating,
            loser.name(),
            loser_standing.rating
        );

        Ok(self.cache.notify_mutated(&[&winner, &loser]).await?)
    }
}
