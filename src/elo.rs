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

//! Elo rating update for a single pairwise outcome.
//!
//! Pure functions, no state. The caller is in charge of reading the standings under the candidates' locks and
//! writing back the result before releasing them.

use crate::candidates::Standing;

/// K-factor used when the configuration doesn't provide one.
pub const DEFAULT_K_FACTOR: f64 = 20.0;

/// Rating difference that multiplies the odds by 10.
const ELO_SCALE: f64 = 400.0;

/// Probability of a candidate rated `rating` beating an opponent rated `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / ELO_SCALE))
}

/// Rating deltas of a match, in the order (winner, loser).
pub fn rating_deltas(winner: f64, loser: f64, k_factor: f64) -> (f64, f64) {
    let expected_winner = expected_score(winner, loser);
    let expected_loser = expected_score(loser, winner);

    (
        k_factor * (1.0 - expected_winner),
        k_factor * (0.0 - expected_loser),
    )
}

/// New standings after `winner` beat `loser`.
pub fn apply_outcome(winner: Standing, loser: Standing, k_factor: f64) -> (Standing, Standing) {
    let (winner_delta, loser_delta) = rating_deltas(winner.rating, loser.rating, k_factor);

    (
        Standing {
            rating: winner.rating + winner_delta,
            wins: winner.wins + 1,
            ..winner
        },
        Standing {
            rating: loser.rating + loser_delta,
            losses: loser.losses + 1,
            ..loser
        },
    )
}
