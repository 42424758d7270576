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

//! Module that contains the definitions of the candidates of the arena and the contract of the backends
//! that persist them.
//!
//! # Description
//!
//! A candidate exists in two shapes:
//!
//! - [CandidateRecord]: a plain value with a copy of every field. This is what the backends read and write,
//!   and what the ranking snapshots and the HTTP endpoints hand out.
//! - [Candidate]: the single instance per ID owned by the cache. The descriptive attributes are immutable, and
//!   the [Standing] (rating and counters) lives behind a lock so readers never observe a half-written update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::RwLock;

mod memory_store;
mod pg_store;

pub use memory_store::MemoryCandidateStore;
pub use pg_store::PgCandidateStore;

use crate::errors::StoreError;

/// Identity of a candidate. Assigned by the backend on insertion.
pub type CandidateId = i64;

/// Rating of every candidate when it joins the arena.
pub const INITIAL_RATING: f64 = 1000.0;

/// Attributes of a candidate that was not persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub link: String,
}

impl NewCandidate {
    pub fn new(name: &str, description: &str, image: &str, link: &str) -> Self {
        NewCandidate {
            name: name.to_owned(),
            description: description.to_owned(),
            image: image.to_owned(),
            link: link.to_owned(),
        }
    }
}

/// Mutable part of a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standing {
    pub rating: f64,
    pub wins: u64,
    pub losses: u64,
}

impl Default for Standing {
    fn default() -> Self {
        Standing {
            rating: INITIAL_RATING,
            wins: 0,
            losses: 0,
        }
    }
}

/// Value copy of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub name: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub rating: f64,
    pub wins: u64,
    pub losses: u64,
    pub created_at: DateTime<Utc>,
}

impl CandidateRecord {
    pub fn standing(&self) -> Standing {
        Standing {
            rating: self.rating,
            wins: self.wins,
            losses: self.losses,
        }
    }
}

/// Candidate instance managed by [crate::cache::CandidateCache].
///
/// # Description
///
/// Instances are shared as `Arc<Candidate>`. The cache keeps exactly one instance per ID, and every vote
/// mutates that instance. The inner lock only protects readers from torn values; it does not serialize
/// read-modify-write sequences. Callers that update the standing must hold the candidate's lock from
/// [crate::locks::CandidateLocks] for the whole sequence.
#[derive(Debug)]
pub struct Candidate {
    id: CandidateId,
    name: String,
    description: String,
    image: String,
    link: String,
    created_at: DateTime<Utc>,
    standing: RwLock<Standing>,
}

impl Candidate {
    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current rating and counters.
    pub async fn standing(&self) -> Standing {
        *self.standing.read().await
    }

    /// Overwrites the rating and counters.
    pub async fn set_standing(&self, standing: Standing) {
        *self.standing.write().await = standing;
    }

    /// Builds a value copy of the candidate.
    pub async fn record(&self) -> CandidateRecord {
        let standing = self.standing().await;

        CandidateRecord {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            link: self.link.clone(),
            rating: standing.rating,
            wins: standing.wins,
            losses: standing.losses,
            created_at: self.created_at,
        }
    }
}

impl From<CandidateRecord> for Candidate {
    fn from(value: CandidateRecord) -> Self {
        let standing = value.standing();

        Candidate {
            id: value.id,
            name: value.name,
            description: value.description,
            image: value.image,
            link: value.link,
            created_at: value.created_at,
            standing: RwLock::new(standing),
        }
    }
}

/// Contract of the backends that persist the candidates.
///
/// # Description
///
/// Every call is awaited to completion by the cache, thus from its point of view the backend is synchronous,
/// reliable per call and possibly slow.
pub trait CandidateStore: Send + Sync + 'static {
    /// Full scan of the stored candidates.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<CandidateRecord>, StoreError>> + Send;

    /// Retrieves a candidate. `None` is returned when the ID doesn't exist.
    fn fetch_by_id(
        &self,
        id: CandidateId,
    ) -> impl Future<Output = Result<Option<CandidateRecord>, StoreError>> + Send;

    /// Stores a new candidate and returns it with the ID assigned by the backend.
    fn insert(
        &self,
        candidate: &NewCandidate,
    ) -> impl Future<Output = Result<CandidateRecord, StoreError>> + Send;

    /// Overwrites all the fields of an existing candidate.
    fn persist(
        &self,
        candidate: &CandidateRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
