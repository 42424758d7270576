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

use crate::helpers::{SCP_NAMES, test_setup};
use arena::{
    Ballot, WriteBack,
    candidates::{NewCandidate, Standing},
    errors::VoteError,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

/// TC: Concurrent votes over the same candidate are all counted.
///
/// # Description
///
/// ## Pre
///
/// - 7 candidates rated 1000 with no matches.
///
/// ## Inputs
///
/// - 400 votes submitted at once. Candidate 1 takes part in all of them, half as winner and half as loser,
///   against the rest of candidates.
///
/// ## Result
///
/// Candidate 1 accounts for 400 matches, the total of wins and losses match, and the sum of ratings is kept
/// (each vote moves the same amount of points from the loser to the winner). After a flush, the backend holds
/// the same values as the cache.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_votes_lose_nothing() {
    let app = test_setup(&SCP_NAMES).await;
    let votes = &app.state.votes;

    let mut handles = Vec::new();
    for i in 0..400 {
        let opponent = i % 6 + 2;
        let ballot = if i % 2 == 0 {
            Ballot::new(1, opponent)
        } else {
            Ballot::new(opponent, 1)
        };
        handles.push(votes.submit(ballot));
    }

    for handle in handles {
        handle
            .await
            .expect("Vote task panicked")
            .expect("Failed to process a vote");
    }

    let first = app.standing(1).await;
    assert_eq!(first.wins + first.losses, 400);
    assert_eq!(first.wins, 200);

    let mut standings = Vec::new();
    for id in 1..=7 {
        standings.push(app.standing(id).await);
    }
    let wins: u64 = standings.iter().map(|s| s.wins).sum();
    let losses: u64 = standings.iter().map(|s| s.losses).sum();
    let ratings: f64 = standings.iter().map(|s| s.rating).sum();

    assert_eq!(wins, 400);
    assert_eq!(losses, 400);
    assert!((ratings - 7000.0).abs() < 1e-6, "Rating points leaked: {ratings}");

    app.cache.flush().await.expect("Failed to flush");
    assert_eq!(app.cache.dirty_count().await, 0);
    assert_eq!(app.stored_standings().await, standings);
}

/// TC: Votes reach the backend once the write-back interval expires.
///
/// # Description
///
/// ## Pre
///
/// - Write-back interval of 10 s, paused clock.
///
/// ## TC
///
/// The first votes are kept in memory. The first vote after the interval writes back all of them.
#[tokio::test(start_paused = true)]
async fn votes_are_written_back_in_batches() {
    let app = test_setup(&SCP_NAMES).await;
    let votes = &app.state.votes;

    for (winner, loser) in [(1, 2), (3, 4), (1, 3)] {
        let outcome = votes
            .process(Ballot::new(winner, loser))
            .await
            .expect("Failed to process a vote");
        assert_eq!(outcome, WriteBack::Deferred);
    }
    assert!(app.stored_standings().await.iter().all(|s| *s == Standing::default()));
    assert_eq!(app.cache.dirty_count().await, 4);

    tokio::time::advance(Duration::from_secs(10)).await;

    let outcome = votes
        .submit(Ballot::new(5, 6))
        .await
        .expect("Vote task panicked")
        .expect("Failed to process a vote");
    assert_eq!(outcome, WriteBack::Flushed);
    assert_eq!(app.cache.dirty_count().await, 0);

    let stored = app.stored_standings().await;
    let counters: Vec<(u64, u64)> = stored.iter().map(|s| (s.wins, s.losses)).collect();
    assert_eq!(
        counters,
        vec![(2, 0), (0, 1), (1, 1), (0, 1), (1, 0), (0, 1), (0, 0)]
    );
    for id in 1..=7 {
        assert_eq!(app.standing(id).await, stored[id as usize - 1]);
    }
}

/// TC: Votes survive the creation of a candidate.
///
/// # Description
///
/// ## TC
///
/// Creating a candidate writes back the votes already processed before reloading the cache, so none of them
/// is lost. Votes for the new candidate are accepted right after. A vote still in progress during the reload
/// would be refused when notifying the cache, but this test doesn't overlap them.
#[tokio::test]
async fn votes_survive_a_reload() {
    let app = test_setup(&SCP_NAMES[..3]).await;
    let votes = &app.state.votes;

    votes.process(Ballot::new(2, 3)).await.unwrap();

    let record = app
        .cache
        .create(&NewCandidate::new(
            "SCP-914",
            "The Clockworks",
            "scp_914.jpg",
            "http://www.scp-wiki.net/scp-914",
        ))
        .await
        .expect("Failed to create a candidate");

    assert_eq!(app.standing(2).await.wins, 1);
    assert_eq!(app.standing(3).await.losses, 1);

    votes.process(Ballot::new(record.id, 2)).await.unwrap();
    assert_eq!(app.standing(record.id).await.wins, 1);
    assert_eq!(app.standing(2).await.losses, 1);

    assert!(matches!(
        votes.process(Ballot::new(record.id, 99)).await,
        Err(VoteError::UnknownCandidate(99))
    ));
}
