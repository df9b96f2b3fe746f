use rocket::{
    serde::json::{serde_json::json, Json, Value},
    Route, State,
};

use crate::error::Result;
use crate::model::{
    api::{ElectionResults, ElectionStatistics, PositionResults, Winner},
    common::{ElectionId, PositionId},
};
use crate::service::BallotEngine;

pub fn routes() -> Vec<Route> {
    routes![
        election_results,
        position_results,
        statistics,
        turnout,
        winners
    ]
}

#[get("/elections/<election_id>/results")]
async fn election_results(
    election_id: ElectionId,
    engine: &State<BallotEngine>,
) -> Result<Json<ElectionResults>> {
    Ok(Json(engine.results(election_id).await?))
}

#[get("/elections/<election_id>/positions/<position_id>/results")]
async fn position_results(
    election_id: ElectionId,
    position_id: PositionId,
    engine: &State<BallotEngine>,
) -> Result<Json<PositionResults>> {
    Ok(Json(engine.position_results(election_id, position_id).await?))
}

#[get("/elections/<election_id>/statistics")]
async fn statistics(
    election_id: ElectionId,
    engine: &State<BallotEngine>,
) -> Result<Json<ElectionStatistics>> {
    Ok(Json(engine.statistics(election_id).await?))
}

#[get("/elections/<election_id>/turnout")]
async fn turnout(election_id: ElectionId, engine: &State<BallotEngine>) -> Result<Value> {
    let turnout = engine.turnout(election_id).await?;
    Ok(json!({
        "election_id": election_id,
        "turnout_percentage": turnout,
    }))
}

#[get("/elections/<election_id>/winners")]
async fn winners(
    election_id: ElectionId,
    engine: &State<BallotEngine>,
) -> Result<Json<Vec<Winner>>> {
    Ok(Json(engine.winners(election_id).await?))
}
