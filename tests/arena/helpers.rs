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

use arena::{
    CandidateCache, MemoryCandidateStore, WebServerState,
    candidates::{CandidateId, CandidateStore, NewCandidate, Standing},
    configuration::CacheSettings,
    elo::DEFAULT_K_FACTOR,
};
use once_cell::sync::Lazy;
use std::{sync::Arc, time::Duration};
use tracing::{Level, level_filters::LevelFilter};
use tracing_subscriber::{Layer, filter::Targets, fmt, prelude::*};

static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let level = std::env::var("TEST_LOG").expect("Failed to read the content of TEST_LOG var");

        let (tracing_level, tracing_levelfilter) = match level.as_str() {
            "info" => (Level::INFO, LevelFilter::INFO),
            "debug" => (Level::DEBUG, LevelFilter::DEBUG),
            "warn" => (Level::WARN, LevelFilter::WARN),
            "error" => (Level::ERROR, LevelFilter::ERROR),
            &_ => (Level::TRACE, LevelFilter::TRACE),
        };

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(tracing_levelfilter),
            )
            .with(Targets::new().with_target("arena", tracing_level))
            .init();
    }
});

pub const SCP_NAMES: [&str; 7] = [
    "SCP-049", "SCP-055", "SCP-087", "SCP-096", "SCP-106", "SCP-173", "SCP-682",
];

pub struct TestApp {
    pub store: MemoryCandidateStore,
    pub cache: Arc<CandidateCache<MemoryCandidateStore>>,
    pub state: WebServerState<MemoryCandidateStore>,
}

impl TestApp {
    pub async fn standing(&self, id: CandidateId) -> Standing {
        self.cache
            .get(id)
            .await
            .expect("Failed to load the cache")
            .expect("Missing candidate")
            .standing()
            .await
    }

    /// Standings as stored in the backend, sorted by ID.
    pub async fn stored_standings(&self) -> Vec<Standing> {
        self.store
            .fetch_all()
            .await
            .expect("Failed to read the store")
            .iter()
            .map(|c| c.standing())
            .collect()
    }
}

/// Builds an arena whose candidates get the IDs from 1 to `names.len()`.
pub async fn test_setup(names: &[&str]) -> TestApp {
    Lazy::force(&TRACING);

    let store = MemoryCandidateStore::new();
    for name in names {
        store
            .insert(&NewCandidate::new(name, "", "", ""))
            .await
            .expect("Failed to seed the store");
    }

    let cache = Arc::new(CandidateCache::new(
        store.clone(),
        &CacheSettings::default(),
    ));
    let state = WebServerState::new(cache.clone(), DEFAULT_K_FACTOR);

    TestApp {
        store,
        cache,
        state,
    }
}

/// Polls `check` until it returns true. Panics after 5 s.
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("Condition not met in time");
}
