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

//! Module with the PostgreSQL backend of the candidates.

use crate::{
    candidates::{CandidateId, CandidateRecord, CandidateStore, INITIAL_RATING, NewCandidate},
    configuration::DatabaseSettings,
    errors::StoreError,
};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{debug, error, instrument, trace};

/// Columns of the table `candidates`, in the order expected by [CandidateBd].
const CANDIDATE_COLUMNS: &str =
    "id, name, description, image, link, rating, wins, losses, created_at";

#[derive(Clone)]
pub struct PgCandidateStore {
    db_pool: PgPool,
}

impl PgCandidateStore {
    #[instrument(name = "Connect DB backend for the candidates", skip(settings))]
    pub async fn connect_backend(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.pg_max_connections)
            .connect_with(settings.connection())
            .await
            .map_err(|e| {
                error!("{e}");
                StoreError::Unknown(e.to_string())
            })?;

        trace!("PostgreSQL database server successfully connected");

        Ok(Self { db_pool })
    }

    /// Builds a store on top of an existing pool.
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Applies the pending migrations of the `candidates` schema.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .map_err(|e| StoreError::Unknown(e.to_string()))
    }
}

impl CandidateStore for PgCandidateStore {
    #[instrument(name = "Retrieve all the candidates", skip(self))]
    async fn fetch_all(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CandidateBd>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates ORDER BY id"
        ))
        .fetch_all(&self.db_pool)
        .await?;

        debug!("Obtained {} candidates from the DB", rows.len());

        rows.into_iter().map(CandidateRecord::try_from).collect()
    }

    async fn fetch_by_id(&self, id: CandidateId) -> Result<Option<CandidateRecord>, StoreError> {
        let row = sqlx::query_as::<_, CandidateBd>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        row.map(CandidateRecord::try_from).transpose()
    }

    #[instrument(name = "Insert a new candidate", skip(self))]
    async fn insert(&self, candidate: &NewCandidate) -> Result<CandidateRecord, StoreError> {
        if candidate.name.is_empty() {
            return Err(StoreError::InvalidCandidateInfo(
                "Empty candidate name".to_owned(),
            ));
        }

        let row = sqlx::query_as::<_, CandidateBd>(&format!(
            r#"
            INSERT INTO candidates (name, description, image, link, rating, wins, losses)
            VALUES ($1, $2, $3, $4, $5, 0, 0)
            RETURNING {CANDIDATE_COLUMNS}
            "#
        ))
        .bind(&candidate.name)
        .bind(&candidate.description)
        .bind(&candidate.image)
        .bind(&candidate.link)
        .bind(INITIAL_RATING)
        .fetch_one(&self.db_pool)
        .await?;

        debug!("Candidate {} stored with ID {}", candidate.name, row.id);

        CandidateRecord::try_from(row)
    }

    async fn persist(&self, candidate: &CandidateRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE candidates
            SET name = $1, description = $2, image = $3, link = $4, rating = $5, wins = $6, losses = $7,
                updated_at = NOW()
            WHERE id = $8
            "#,
        )
        .bind(&candidate.name)
        .bind(&candidate.description)
        .bind(&candidate.image)
        .bind(&candidate.link)
        .bind(candidate.rating)
        .bind(to_db_counter(candidate.wins)?)
        .bind(to_db_counter(candidate.losses)?)
        .bind(candidate.id)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(candidate.id));
        }

        trace!("Candidate {} written back", candidate.id);

        Ok(())
    }
}

fn to_db_counter(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidCandidateInfo(format!("Counter overflow: {value}")))
}

/// Mirror data object of [CandidateRecord] to interact with the DB.
///
/// # Description
///
/// PostgreSQL has no unsigned integers, the counters are stored as `BIGINT`.
#[derive(Debug, sqlx::FromRow)]
struct CandidateBd {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub rating: f64,
    pub wins: i64,
    pub losses: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CandidateBd> for CandidateRecord {
    type Error = StoreError;

    fn try_from(value: CandidateBd) -> Result<Self, Self::Error> {
        let wins = match u64::try_from(value.wins) {
            Ok(w) => w,
            Err(_) => {
                return Err(StoreError::InvalidCandidateInfo(format!(
                    "Negative wins for candidate {}",
                    value.id
                )));
            }
        };

        let losses = match u64::try_from(value.losses) {
            Ok(l) => l,
            Err(_) => {
                return Err(StoreError::InvalidCandidateInfo(format!(
                    "Negative losses for candidate {}",
                    value.id
                )));
            }
        };

        Ok(CandidateRecord {
            id: value.id,
            name: value.name,
            description: value.description,
            image: value.image,
            link: value.link,
            rating: value.rating,
            wins,
            losses,
            created_at: value.created_at,
        })
    }
}
