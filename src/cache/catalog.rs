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

//! Representation of the set of candidates loaded in the cache.

use crate::{
    candidates::{Candidate, CandidateId, CandidateRecord},
    errors::CacheError,
};
use rand::Rng;
use std::{
    collections::{HashMap, HashSet, hash_map::Entry},
    sync::Arc,
};

/// Draws allowed to pick `count` candidates before giving up.
pub(crate) fn sampling_budget(count: usize) -> usize {
    2 * count + 50
}

/// Object that holds the candidates managed by the cache.
///
/// # Description
///
/// The catalog owns the only instance of each candidate that votes are allowed to mutate. The map finds them by
/// ID, and a [Vec] with the same instances in load order allows drawing random candidates in O(1). When the
/// backend returns a record twice, the first one is kept.
///
/// A catalog is immutable once built. Reloading the cache means building a new one.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    candidates: HashMap<CandidateId, Arc<Candidate>>,
    ordered: Vec<Arc<Candidate>>,
}

impl Catalog {
    pub fn from_records(records: Vec<CandidateRecord>) -> Self {
        let mut catalog = Catalog {
            candidates: HashMap::with_capacity(records.len()),
            ordered: Vec::with_capacity(records.len()),
        };

        for record in records {
            if let Entry::Vacant(slot) = catalog.candidates.entry(record.id) {
                let candidate = Arc::new(Candidate::from(record));
                catalog.ordered.push(candidate.clone());
                slot.insert(candidate);
            }
        }

        catalog
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn get(&self, id: CandidateId) -> Option<Arc<Candidate>> {
        self.candidates.get(&id).cloned()
    }

    /// Returns true when `candidate` is the very instance owned by this catalog.
    pub fn is_managed(&self, candidate: &Arc<Candidate>) -> bool {
        self.candidates
            .get(&candidate.id())
            .is_some_and(|managed| Arc::ptr_eq(managed, candidate))
    }

    /// Iterates over the candidates in load order.
    pub fn candidates(&self) -> impl Iterator<Item = &Arc<Candidate>> {
        self.ordered.iter()
    }

    /// Picks `count` different candidates uniformly at random.
    ///
    /// # Description
    ///
    /// `count` must be within `[1, len]`; the caller checks it. Indexes are drawn with replacement and collisions
    /// are drawn again, which is cheaper than shuffling the whole list when `count` is small compared to the
    /// catalog. The number of draws is bounded by [sampling_budget].
    pub fn sample<R: Rng>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Arc<Candidate>>, CacheError> {
        Ok(sample_indices(self.len(), count, rng)?
            .into_iter()
            .map(|index| self.ordered[index].clone())
            .collect())
    }
}

pub(crate) fn sample_indices<R: Rng>(
    total: usize,
    count: usize,
    rng: &mut R,
) -> Result<Vec<usize>, CacheError> {
    let budget = sampling_budget(count);
    let mut drawn = HashSet::with_capacity(count);
    let mut picked = Vec::with_capacity(count);

    for _ in 0..budget {
        if picked.len() == count {
            break;
        }

        let index = rng.random_range(0..total);
        if drawn.insert(index) {
            picked.push(index);
        }
    }

    if picked.len() < count {
        return Err(CacheError::ExhaustedRetries { attempts: budget });
    }

    Ok(picked)
}
