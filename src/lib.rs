#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing, EngineFairing};
use crate::logging::LoggerFairing;
use crate::service::BallotEngine;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;

/// Build the production server: config, MongoDB, the ballot engine over it,
/// and every route.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(EngineFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// Build a server around an already-assembled engine.
pub fn rocket_for_engine(engine: BallotEngine) -> Rocket<Build> {
    let config = engine.config().clone();
    rocket::build()
        .attach(LoggerFairing)
        .manage(config)
        .manage(engine)
        .mount("/", api::routes())
        .register("/", api::catchers())
}
