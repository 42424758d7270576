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

//! In-memory backend of the candidates.
//!
//! # Description
//!
//! It follows the same rules as the PostgreSQL backend (unique non-empty names, IDs assigned on insertion),
//! and it is meant for tests and local runs without a DB server. The handle is cheap to clone and every clone
//! sees the same content, so a test can keep a handle to inspect what the cache wrote back.
//!
//! Writes of specific candidates can be forced to fail using [MemoryCandidateStore::fail_persist_of], and full
//! scans using [MemoryCandidateStore::fail_full_scans].

use crate::{
    candidates::{CandidateId, CandidateRecord, CandidateStore, INITIAL_RATING, NewCandidate},
    errors::StoreError,
};
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct MemoryState {
    candidates: BTreeMap<CandidateId, CandidateRecord>,
    next_id: CandidateId,
    failing: HashSet<CandidateId>,
    failing_scans: usize,
    full_scans: usize,
    writes: usize,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryCandidateStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following [CandidateStore::persist] of `id` fail until [MemoryCandidateStore::heal] is called.
    pub async fn fail_persist_of(&self, id: CandidateId) {
        self.state.lock().await.failing.insert(id);
    }

    /// Makes the next `times` calls to [CandidateStore::fetch_all] fail.
    pub async fn fail_full_scans(&self, times: usize) {
        self.state.lock().await.failing_scans = times;
    }

    /// Removes all the injected failures.
    pub async fn heal(&self) {
        let mut state = self.state.lock().await;
        state.failing.clear();
        state.failing_scans = 0;
    }

    /// Number of [CandidateStore::fetch_all] calls served so far.
    pub async fn full_scans(&self) -> usize {
        self.state.lock().await.full_scans
    }

    /// Number of successful [CandidateStore::persist] calls so far.
    pub async fn writes(&self) -> usize {
        self.state.lock().await.writes
    }
}

impl CandidateStore for MemoryCandidateStore {
    async fn fetch_all(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.full_scans += 1;

        if state.failing_scans > 0 {
            state.failing_scans -= 1;
            return Err(StoreError::Unknown(
                "Injected failure while reading the candidates".to_owned(),
            ));
        }

        Ok(state.candidates.values().cloned().collect())
    }

    async fn fetch_by_id(&self, id: CandidateId) -> Result<Option<CandidateRecord>, StoreError> {
        Ok(self.state.lock().await.candidates.get(&id).cloned())
    }

    async fn insert(&self, candidate: &NewCandidate) -> Result<CandidateRecord, StoreError> {
        if candidate.name.is_empty() {
            return Err(StoreError::InvalidCandidateInfo(
                "Empty candidate name".to_owned(),
            ));
        }

        let mut state = self.state.lock().await;

        if state
            .candidates
            .values()
            .any(|c| c.name == candidate.name)
        {
            warn!("Attempt to insert a duplicated candidate: {}", candidate.name);
            return Err(StoreError::DuplicatedName(candidate.name.clone()));
        }

        state.next_id += 1;
        let record = CandidateRecord {
            id: state.next_id,
            name: candidate.name.clone(),
            description: candidate.description.clone(),
            image: candidate.image.clone(),
            link: candidate.link.clone(),
            rating: INITIAL_RATING,
            wins: 0,
            losses: 0,
            created_at: Utc::now(),
        };
        state.candidates.insert(record.id, record.clone());

        debug!("Candidate {} stored with ID {}", record.name, record.id);

        Ok(record)
    }

    async fn persist(&self, candidate: &CandidateRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        if state.failing.contains(&candidate.id) {
            return Err(StoreError::Unknown(format!(
                "Injected failure while writing candidate {}",
                candidate.id
            )));
        }

        match state.candidates.get_mut(&candidate.id) {
            Some(stored) => *stored = candidate.clone(),
            None => return Err(StoreError::NotFound(candidate.id)),
        }
        state.writes += 1;

        Ok(())
    }
}
