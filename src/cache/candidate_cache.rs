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

//! Module with the logic of the candidate cache.

use crate::{
    cache::catalog::Catalog,
    candidates::{Candidate, CandidateId, CandidateRecord, CandidateStore, NewCandidate},
    configuration::CacheSettings,
    errors::CacheError,
};
use std::{collections::BTreeSet, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, error, info, instrument, trace, warn};

/// Outcome of [CandidateCache::notify_mutated].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBack {
    /// The pending changes were written to the backend before returning.
    Flushed,
    /// The changes stay in memory until the next flush.
    Deferred,
}

#[derive(Debug)]
struct RankingSnapshot {
    candidates: Arc<[CandidateRecord]>,
    refreshed_at: Instant,
}

#[derive(Debug)]
struct WriteBackState {
    dirty: BTreeSet<CandidateId>,
    last_flush: Instant,
}

/// In-memory owner of the candidates of the arena.
///
/// # Description
///
/// The cache loads every candidate from the backend the first time one is requested, and hands out shared
/// references to the loaded instances. Votes mutate those instances in place and then call
/// [CandidateCache::notify_mutated], which marks them as dirty. Dirty candidates are written back in batches:
/// at most once per write-back interval, unless [CandidateCache::flush] is called explicitly.
///
/// A ranking of all the candidates is computed on demand and reused until the ranking refresh interval
/// expires.
///
/// Adding a candidate invalidates everything, so the next call reloads the catalog from the backend. Instances
/// obtained before the reload are no longer managed, and the cache refuses to write them back.
///
/// Each piece of state has its own lock:
/// - The catalog slot is written under `load_lock`.
/// - The ranking snapshot is recomputed under `ranking_lock`.
/// - The dirty set and the instant of the last flush live behind the `write_back` lock.
///
/// The cache never takes the per-candidate locks of [crate::locks::CandidateLocks].
pub struct CandidateCache<S: CandidateStore> {
    store: S,
    write_back_interval: Duration,
    ranking_refresh_interval: Duration,
    catalog: RwLock<Option<Arc<Catalog>>>,
    load_lock: Mutex<()>,
    ranking: RwLock<Option<RankingSnapshot>>,
    ranking_lock: Mutex<()>,
    write_back: Mutex<WriteBackState>,
}

impl<S: CandidateStore> CandidateCache<S> {
    pub fn new(store: S, settings: &CacheSettings) -> Self {
        CandidateCache {
            store,
            write_back_interval: Duration::from_secs(settings.write_back_interval),
            ranking_refresh_interval: Duration::from_secs(settings.ranking_refresh_interval),
            catalog: RwLock::new(None),
            load_lock: Mutex::new(()),
            ranking: RwLock::new(None),
            ranking_lock: Mutex::new(()),
            write_back: Mutex::new(WriteBackState {
                dirty: BTreeSet::new(),
                last_flush: Instant::now(),
            }),
        }
    }

    /// Returns the loaded catalog, loading it from the backend when missing.
    async fn catalog(&self) -> Result<Arc<Catalog>, CacheError> {
        let loaded = self.catalog.read().await.clone();
        if let Some(catalog) = loaded {
            return Ok(catalog);
        }

        let _load = self.load_lock.lock().await;

        // Another task might have loaded it while this one was waiting for the lock.
        let loaded = self.catalog.read().await.clone();
        if let Some(catalog) = loaded {
            return Ok(catalog);
        }

        let catalog = Arc::new(self.load().await?);
        *self.catalog.write().await = Some(catalog.clone());

        Ok(catalog)
    }

    #[instrument(name = "Load the candidate cache", skip(self))]
    async fn load(&self) -> Result<Catalog, CacheError> {
        let records = self.store.fetch_all().await.map_err(|e| {
            error!("Failed to load the candidates: {e}");
            e
        })?;

        let catalog = Catalog::from_records(records);
        info!("Candidate cache loaded with {} candidates", catalog.len());

        Ok(catalog)
    }

    /// Clears the catalog and the ranking snapshot.
    async fn invalidate(&self) {
        let _load = self.load_lock.lock().await;
        *self.catalog.write().await = None;
        *self.ranking.write().await = None;
        debug!("Candidate cache invalidated");
    }

    /// Retrieves the managed instance of a candidate.
    ///
    /// # Description
    ///
    /// `None` is returned when no candidate has the given ID. The returned instance is shared with every other
    /// caller: mutate it only while holding its lock, and report the change using
    /// [CandidateCache::notify_mutated].
    pub async fn get(&self, id: CandidateId) -> Result<Option<Arc<Candidate>>, CacheError> {
        Ok(self.catalog().await?.get(id))
    }

    /// Picks `count` different candidates at random.
    ///
    /// # Description
    ///
    /// `count` must be within `[1, total]`, otherwise [CacheError::InvalidArgument] is returned.
    /// [CacheError::ExhaustedRetries] means that the random draws kept colliding; calling again is fine.
    pub async fn random(&self, count: i64) -> Result<Vec<Arc<Candidate>>, CacheError> {
        let catalog = self.catalog().await?;
        let total = catalog.len();

        let requested = usize::try_from(count)
            .ok()
            .filter(|n| (1..=total).contains(n))
            .ok_or(CacheError::InvalidArgument {
                requested: count,
                total,
            })?;

        catalog.sample(requested, &mut rand::rng())
    }

    /// Returns all the candidates sorted by rating.
    ///
    /// # Description
    ///
    /// Higher ratings come first, and ties are sorted by ascending ID. The result is a snapshot: later votes
    /// don't modify it. The same snapshot is returned until the ranking refresh interval expires.
    pub async fn ranked(&self) -> Result<Arc<[CandidateRecord]>, CacheError> {
        if let Some(snapshot) = self.fresh_ranking().await {
            return Ok(snapshot);
        }

        let _refresh = self.ranking_lock.lock().await;

        if let Some(snapshot) = self.fresh_ranking().await {
            return Ok(snapshot);
        }

        let catalog = self.catalog().await?;
        let mut records = Vec::with_capacity(catalog.len());
        for candidate in catalog.candidates() {
            records.push(candidate.record().await);
        }
        sort_ranking(&mut records);
        let snapshot: Arc<[CandidateRecord]> = records.into();

        // A snapshot built from a catalog that got invalidated in the meantime is served but not kept.
        let current = self.catalog.read().await.clone();
        if current.is_some_and(|c| Arc::ptr_eq(&c, &catalog)) {
            *self.ranking.write().await = Some(RankingSnapshot {
                candidates: snapshot.clone(),
                refreshed_at: Instant::now(),
            });
            trace!("Ranking refreshed");
        }

        Ok(snapshot)
    }

    async fn fresh_ranking(&self) -> Option<Arc<[CandidateRecord]>> {
        self.ranking
            .read()
            .await
            .as_ref()
            .filter(|s| s.refreshed_at.elapsed() < self.ranking_refresh_interval)
            .map(|s| s.candidates.clone())
    }

    /// Stores a new candidate and reloads the cache.
    ///
    /// # Description
    ///
    /// Pending changes are written back before dropping the loaded catalog. When that write-back fails, the
    /// candidate is stored anyway and the cache is invalidated, but the error is returned.
    #[instrument(name = "Create a candidate", skip(self))]
    pub async fn create(&self, candidate: &NewCandidate) -> Result<CandidateRecord, CacheError> {
        let record = self.store.insert(candidate).await.map_err(|e| {
            warn!("Candidate {} not stored: {e}", candidate.name);
            e
        })?;

        info!("New candidate {} with ID {}", record.name, record.id);

        self.synchronise_then_invalidate().await?;

        Ok(record)
    }

    /// Reports changes made to managed instances.
    ///
    /// # Description
    ///
    /// The caller must hold the locks of the given candidates. Every candidate has to be the instance currently
    /// managed by the cache, otherwise [CacheError::StaleReference] is returned and nothing is marked.
    ///
    /// When the write-back interval has elapsed since the last flush, all the pending changes are written back
    /// before returning. Otherwise, the call returns right away.
    pub async fn notify_mutated(
        &self,
        candidates: &[&Arc<Candidate>],
    ) -> Result<WriteBack, CacheError> {
        let catalog = self.catalog().await?;

        if let Some(stale) = candidates.iter().find(|c| !catalog.is_managed(c)) {
            warn!(
                "Candidate {} is not managed by the cache, changes dropped",
                stale.id()
            );
            return Err(CacheError::StaleReference(stale.id()));
        }

        let mut state = self.write_back.lock().await;
        state.dirty.extend(candidates.iter().map(|c| c.id()));

        if state.last_flush.elapsed() < self.write_back_interval {
            trace!("Write-back deferred, {} candidates pending", state.dirty.len());
            return Ok(WriteBack::Deferred);
        }

        self.flush_pending(&mut state).await?;

        Ok(WriteBack::Flushed)
    }

    /// Writes back every pending change and returns the number of candidates written.
    #[instrument(name = "Write back dirty candidates", skip(self))]
    pub async fn flush(&self) -> Result<usize, CacheError> {
        let mut state = self.write_back.lock().await;
        self.flush_pending(&mut state).await
    }

    async fn flush_pending(&self, state: &mut WriteBackState) -> Result<usize, CacheError> {
        state.last_flush = Instant::now();

        if state.dirty.is_empty() {
            return Ok(0);
        }

        let catalog = self.catalog.read().await.clone();
        let pending: Vec<CandidateId> = state.dirty.iter().copied().collect();
        let mut written = 0;

        for id in pending {
            let Some(candidate) = catalog.as_ref().and_then(|c| c.get(id)) else {
                debug!("Candidate {id} is no longer cached, write-back dropped");
                state.dirty.remove(&id);
                continue;
            };

            let record = candidate.record().await;
            if let Err(e) = self.store.persist(&record).await {
                error!(
                    "Write-back of candidate {id} failed, {} candidates remain pending: {e}",
                    state.dirty.len()
                );
                return Err(e.into());
            }

            state.dirty.remove(&id);
            written += 1;
        }

        debug!("{written} candidates written back");

        Ok(written)
    }

    /// Writes back the pending changes and then clears the catalog and the ranking.
    ///
    /// The cache is invalidated even when the write-back fails.
    pub async fn synchronise_then_invalidate(&self) -> Result<(), CacheError> {
        let mut state = self.write_back.lock().await;
        let flushed = self.flush_pending(&mut state).await;
        self.invalidate().await;

        flushed.map(|_| ())
    }

    /// Number of candidates with changes not written back yet.
    pub async fn dirty_count(&self) -> usize {
        self.write_back.lock().await.dirty.len()
    }

    /// Number of candidates managed by the cache.
    pub async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.catalog().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }

    /// Spawns a task that flushes the pending changes once per write-back interval.
    ///
    /// # Description
    ///
    /// Votes only trigger a write-back when they arrive after the interval. This task makes sure that the last
    /// votes reach the backend even when no more votes arrive. Failures are logged and retried on the next tick.
    pub fn spawn_periodic_flush(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let period = self.write_back_interval.max(Duration::from_secs(1));
        // The schedule starts now, not when the task is first polled.
        let start = Instant::now() + period;

        tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match cache.flush().await {
                    Ok(0) => (),
                    Ok(written) => debug!("Periodic write-back of {written} candidates"),
                    Err(e) => warn!("Periodic write-back failed: {e}"),
                }
            }
        })
    }
}

fn sort_ranking(records: &mut [CandidateRecord]) {
    records.sort_by(|a, b| b.rating.total_cmp(&a.rating).then_with(|| a.id.cmp(&b.id)));
}
