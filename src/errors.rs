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

//! Custom error types.
use crate::candidates::CandidateId;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised by the persistence backends of the candidates.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("candidate {0} not found in the DB")]
    NotFound(CandidateId),
    #[error("duplicated candidate name: {0}")]
    DuplicatedName(String),
    #[error("invalid candidate information: {0}")]
    InvalidCandidateInfo(String),
    #[error("unknown db error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicatedName(db_err.message().to_owned())
            }
            _ => StoreError::Unknown(value.to_string()),
        }
    }
}

/// Errors raised by [crate::cache::CandidateCache].
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid sample size: {requested} (candidates available: {total})")]
    InvalidArgument { requested: i64, total: usize },
    #[error("random sampling gave up after {attempts} draws")]
    ExhaustedRetries { attempts: usize },
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
    #[error("candidate {0} is not the instance managed by the cache")]
    StaleReference(CandidateId),
}

impl CacheError {
    /// Returns true when repeating the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CacheError::ExhaustedRetries { .. } | CacheError::Persistence(_)
        )
    }
}

/// Reasons for a vote to be dropped after it was accepted.
#[derive(Error, Debug)]
pub enum VoteError {
    #[error("unknown candidate ID: {0}")]
    UnknownCandidate(CandidateId),
    #[error("malformed ballot: {0}")]
    MalformedBallot(String),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors returned by the HTTP endpoints.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    ServiceUnavailable,
    InternalServerError,
}

impl From<CacheError> for ApiError {
    fn from(value: CacheError) -> Self {
        if matches!(value, CacheError::InvalidArgument { .. }) {
            ApiError::BadRequest(value.to_string())
        } else if value.is_retryable() {
            ApiError::ServiceUnavailable
        } else {
            ApiError::InternalServerError
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Temporarily unavailable, please try again later".to_owned(),
            ),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            ),
        };
        let body = Json(serde_json::json!({
            "error": error_message,
        }));
        (status, body).into_response()
    }
}
