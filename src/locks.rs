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

//! Per-candidate locks.
//!
//! # Description
//!
//! A vote reads the standing of two candidates, computes the new ratings and writes them back. Two votes that
//! share a candidate must not interleave that sequence, otherwise one of the updates gets lost. [CandidateLocks]
//! keeps one lock per candidate ID, created the first time the ID is used and kept for the life of the process.
//! Catalogs are small, so the table never needs pruning.

use crate::candidates::CandidateId;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Guard of a candidate lock. The lock is released when the guard is dropped.
pub type CandidateGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct CandidateLocks {
    table: Mutex<HashMap<CandidateId, Arc<Mutex<()>>>>,
}

impl CandidateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock of `id`, creating it when missing.
    ///
    /// The table lock is only held for the lookup, never while waiting for the candidate lock.
    async fn lock_of(&self, id: CandidateId) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().await;
        table
            .entry(id)
            .or_insert_with(|| {
                trace!("New lock for candidate {id}");
                Arc::new(Mutex::new(()))
            })
            .clone()
    }

    /// Waits until the lock of `id` is free and takes it.
    pub async fn acquire(&self, id: CandidateId) -> CandidateGuard {
        self.lock_of(id).await.lock_owned().await
    }

    /// Takes the locks of two different candidates.
    ///
    /// # Description
    ///
    /// Locks are always taken in ascending ID order, so two votes over the same pair in opposite directions can't
    /// deadlock. The guards are returned in the order of the arguments.
    pub async fn acquire_pair(
        &self,
        first: CandidateId,
        second: CandidateId,
    ) -> (CandidateGuard, CandidateGuard) {
        debug_assert_ne!(first, second, "a candidate can't be locked twice");

        if first < second {
            let first_guard = self.acquire(first).await;
            let second_guard = self.acquire(second).await;
            (first_guard, second_guard)
        } else {
            let second_guard = self.acquire(second).await;
            let first_guard = self.acquire(first).await;
            (first_guard, second_guard)
        }
    }

    /// Number of locks created so far.
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
