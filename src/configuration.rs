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

//! Arena configuration module
//!
//! # Description
//!
//! This module includes all the definitions for the app's settings and the
//! objects that automate reading the configuration from files or environment
//! variables and parsing them to Rust's native types.
//!
//! Secrets, such as the password of the DB, should be overridden by environment
//! variables. All the environment variables that are meant to be used within this
//! module shall use the prefix _ARENA_, for example: `ARENA__DATABASE__PG_PASSWORD`.

use crate::{candidates::NewCandidate, elo::DEFAULT_K_FACTOR};
use config::{Config, ConfigError, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde_derive::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Name of the directory in which configuration files will be stored.
const CONF_DIR: &str = "config";

/// Main settings `struct`.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Level for the tracing crate.
    pub tracing_level: String,
    /// Application specific settings.
    pub application: ApplicationSettings,
    /// Settings of the PostgreSQL backend.
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub rating: RatingSettings,
    /// Candidates added at start-up when missing in the DB.
    #[serde(default)]
    pub catalog: Vec<NewCandidate>,
}

/// Settings of the HTTP server.
#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    pub http_server_host: String,
    pub http_server_port: u16,
}

/// Settings of the DB backend.
///
/// # Description
///
/// - [DatabaseSettings::pg_password]: override the value of the YML file using an environment variable:
///   `export ARENA__DATABASE__PG_PASSWORD="pass"`.
/// - [DatabaseSettings::pg_ssl_mode]: require SSL when `true`. Otherwise SSL is used only when the server
///   supports it.
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub pg_host: String,
    pub pg_port: u16,
    pub pg_user: String,
    pub pg_password: SecretString,
    pub pg_dbname: String,
    pub pg_ssl_mode: Option<bool>,
    pub pg_max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.pg_host)
            .port(self.pg_port)
            .username(&self.pg_user)
            .password(self.pg_password.expose_secret())
            .database(&self.pg_dbname)
            .ssl_mode(if self.pg_ssl_mode.unwrap_or_default() {
                PgSslMode::Require
            } else {
                PgSslMode::Prefer
            })
    }
}

/// Timing of the candidate cache, in seconds.
///
/// # Description
///
/// - [CacheSettings::write_back_interval]: minimum time between two writes of the votes to the DB.
/// - [CacheSettings::ranking_refresh_interval]: time during which the same ranking is served.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub write_back_interval: u64,
    pub ranking_refresh_interval: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            write_back_interval: 10,
            ranking_refresh_interval: 5,
        }
    }
}

/// Settings of the rating algorithm.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    pub k_factor: f64,
}

impl Default for RatingSettings {
    fn default() -> Self {
        RatingSettings {
            k_factor: DEFAULT_K_FACTOR,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Build the full path of the configuration directory.
        let base_path =
            std::env::current_dir().expect("Failed to determine the current directory.");
        let cfg_dir = base_path.join(CONF_DIR);

        let settings = Config::builder()
            // Start off by merging in the "default" configuration file.
            .add_source(File::from(cfg_dir.join("base")).required(true))
            .add_source(Environment::with_prefix("arena").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
