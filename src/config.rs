use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::{ensure_indexes_exist, MongoAuditLog, MongoDirectory, MongoStore};
use crate::service::{BallotEngine, TtlCache};

/// What happens to a raw vote choice once it has been anonymized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceRetention {
    /// Keep the row, flagged as anonymized. Allows a voter to look up their
    /// own choices through their receipt, and allows forensic audit.
    #[default]
    Retain,
    /// Delete the row in the same transaction, severing the voter link for
    /// anyone with raw storage access too.
    Purge,
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::vote_rate_limit")]
    vote_rate_limit: u32,
    #[serde(default = "defaults::vote_rate_window")]
    vote_rate_window: u32,
    #[serde(default = "defaults::live_results_ttl")]
    live_results_ttl: u32,
    #[serde(default = "defaults::position_results_ttl")]
    position_results_ttl: u32,
    #[serde(default = "defaults::statistics_ttl")]
    statistics_ttl: u32,
    #[serde(default)]
    choice_retention: ChoiceRetention,
}

mod defaults {
    pub fn vote_rate_limit() -> u32 {
        5
    }

    pub fn vote_rate_window() -> u32 {
        60
    }

    pub fn live_results_ttl() -> u32 {
        30
    }

    pub fn position_results_ttl() -> u32 {
        60
    }

    pub fn statistics_ttl() -> u32 {
        45
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vote_rate_limit: defaults::vote_rate_limit(),
            vote_rate_window: defaults::vote_rate_window(),
            live_results_ttl: defaults::live_results_ttl(),
            position_results_ttl: defaults::position_results_ttl(),
            statistics_ttl: defaults::statistics_ttl(),
            choice_retention: ChoiceRetention::default(),
        }
    }
}

impl Config {
    /// Maximum ballot submission attempts per voter within one window.
    pub fn vote_rate_limit(&self) -> u32 {
        self.vote_rate_limit
    }

    /// Length of the rate-limiting window in seconds.
    pub fn vote_rate_window(&self) -> Duration {
        Duration::seconds(self.vote_rate_window.into())
    }

    /// How long whole-election results and winners may be served stale.
    pub fn live_results_ttl(&self) -> Duration {
        Duration::seconds(self.live_results_ttl.into())
    }

    /// How long single-position results may be served stale.
    pub fn position_results_ttl(&self) -> Duration {
        Duration::seconds(self.position_results_ttl.into())
    }

    /// How long statistics and turnout may be served stale.
    pub fn statistics_ttl(&self) -> Duration {
        Duration::seconds(self.statistics_ttl.into())
    }

    pub fn choice_retention(&self) -> ChoiceRetention {
        self.choice_retention
    }

    /// Same configuration with a different rate limit.
    pub fn with_vote_rate_limit(mut self, limit: u32) -> Self {
        self.vote_rate_limit = limit;
        self
    }

    /// Same configuration with a different retention policy.
    pub fn with_choice_retention(mut self, retention: ChoiceRetention) -> Self {
        self.choice_retention = retention;
        self
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config: {e}");
                return Err(rocket);
            }
        };
        info!("Loaded config, choice retention is {:?}", config.choice_retention());

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config: {e}");
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE_NAME);

        // Ensure the uniqueness indexes exist before any ballot arrives.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Name of the database shared with the election-management subsystem.
const DATABASE_NAME: &str = "elections";

/// A fairing that assembles the [`BallotEngine`] from the managed config and
/// database handles and puts it in managed state. Must be attached after
/// [`ConfigFairing`] and [`DatabaseFairing`].
pub struct EngineFairing;

#[rocket::async_trait]
impl Fairing for EngineFairing {
    fn info(&self) -> Info {
        Info {
            name: "Ballot engine",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (Some(config), Some(client), Some(db)) = (
            rocket.state::<Config>().cloned(),
            rocket.state::<MongoClient>().cloned(),
            rocket.state::<Database>().cloned(),
        ) else {
            error!("Ballot engine needs the config and database fairings to run first");
            return Err(rocket);
        };

        let engine = BallotEngine::new(
            MongoStore::new(client, &db),
            MongoDirectory::new(&db),
            MongoAuditLog::new(&db),
            TtlCache::new(),
            &config,
        );
        info!("Ballot engine ready");

        Ok(rocket.manage(engine))
    }
}
