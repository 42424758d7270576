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

use crate::helpers::{SCP_NAMES, test_setup, wait_until};
use arena::{
    Ballot, CandidateStore,
    endpoints::{HealthCheck, VoteRequest, health, matchup, rankings, vote},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn health_check() {
    let Json(status) = health().await;

    assert_eq!(status, HealthCheck { status: "ok" });
    assert_eq!(
        serde_json::to_value(&status).unwrap(),
        serde_json::json!({"status": "ok"})
    );
}

#[tokio::test]
async fn matchups_show_two_different_candidates() {
    let app = test_setup(&SCP_NAMES).await;

    for _ in 0..20 {
        let Json(matchup) = matchup(State(app.state.clone()))
            .await
            .expect("Failed to get a matchup");

        assert_ne!(matchup.left.id, matchup.right.id);
        assert!(SCP_NAMES.contains(&matchup.left.name.as_str()));
        assert!(SCP_NAMES.contains(&matchup.right.name.as_str()));

        for view in [&matchup.left, &matchup.right] {
            let stored = app
                .store
                .fetch_by_id(view.id)
                .await
                .unwrap()
                .expect("Missing candidate");
            assert_eq!(view.created_at, stored.created_at);
        }
    }
}

#[tokio::test]
async fn matchups_need_two_candidates() {
    let app = test_setup(&SCP_NAMES[..1]).await;

    let error = matchup(State(app.state.clone()))
        .await
        .expect_err("A matchup needs two candidates");

    assert_eq!(
        error.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

/// TC: Votes are accepted before they are processed.
///
/// # Description
///
/// ## Inputs
///
/// - A JSON vote: candidate 2 beats candidate 5.
///
/// ## Result
///
/// The handler answers 202 and the vote shows up in the cache shortly after.
#[tokio::test]
async fn votes_are_accepted() {
    let app = test_setup(&SCP_NAMES).await;

    let request: VoteRequest = serde_json::from_str(r#"{"winnerID":2,"loserID":5}"#)
        .expect("Failed to parse a vote request");
    assert_eq!(
        request,
        VoteRequest {
            winner_id: 2,
            loser_id: 5
        }
    );

    let (status, _) = vote(State(app.state.clone()), Json(request)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    wait_until(|| async { app.cache.dirty_count().await == 2 }).await;
    assert_eq!(app.standing(2).await.wins, 1);
    assert_eq!(app.standing(5).await.losses, 1);
}

#[tokio::test]
async fn votes_for_unknown_candidates_are_accepted_and_dropped() {
    let app = test_setup(&SCP_NAMES).await;

    let (status, _) = vote(
        State(app.state.clone()),
        Json(VoteRequest {
            winner_id: 1,
            loser_id: 1000,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // A valid vote submitted afterwards is processed on its own.
    app.state
        .votes
        .submit(Ballot::new(3, 4))
        .await
        .expect("Vote task panicked")
        .expect("Failed to process a vote");

    assert_eq!(app.standing(1).await.wins, 0);
    assert_eq!(app.cache.dirty_count().await, 2);
}

/// TC: Ranking of the candidates.
///
/// # Description
///
/// ## Pre
///
/// - Candidate 3 beat candidate 1 twice.
///
/// ## Result
///
/// Candidate 3 leads the ranking, candidate 1 closes it, and the rest are sorted by ID. Ranks start at 1 and
/// ratings are truncated.
#[tokio::test]
async fn rankings_are_sorted() {
    let app = test_setup(&SCP_NAMES).await;

    for _ in 0..2 {
        app.state.votes.process(Ballot::new(3, 1)).await.unwrap();
    }

    let Json(ranking) = rankings(State(app.state.clone()))
        .await
        .expect("Failed to get the ranking");

    let ids: Vec<i64> = ranking.iter().map(|c| c.id).collect();
    let ranks: Vec<usize> = ranking.iter().map(|c| c.rank).collect();
    assert_eq!(ids, vec![3, 2, 4, 5, 6, 7, 1]);
    assert_eq!(ranks, (1..=7).collect::<Vec<_>>());

    // 1000 + 10 + 9.42...
    assert_eq!(ranking[0].rating, 1019);
    assert_eq!((ranking[0].wins, ranking[0].losses), (2, 0));
    assert_eq!(ranking[6].rating, 980);
    assert_eq!(ranking[1].rating, 1000);
}
