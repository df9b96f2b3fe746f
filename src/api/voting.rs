use rocket::{http::Status, serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::{SubmitBallotRequest, SubmittedBallot, VoteStatus},
    common::ElectionId,
};
use crate::service::{BallotEngine, ClientInfo};

use super::AuthenticatedVoter;

pub fn routes() -> Vec<Route> {
    routes![submit_ballot, vote_status]
}

#[post("/elections/<election_id>/ballots", data = "<ballot>", format = "json")]
async fn submit_ballot(
    voter: AuthenticatedVoter,
    election_id: ElectionId,
    ballot: Json<SubmitBallotRequest>,
    client: ClientInfo,
    engine: &State<BallotEngine>,
) -> Result<(Status, Json<SubmittedBallot>)> {
    let choices = ballot.into_inner().choices;
    let (ballot, receipt) = engine
        .submit(voter.0, election_id, &choices, &client)
        .await?;
    let submitted = SubmittedBallot::new(&ballot, &receipt, choices.len() as u32);
    Ok((Status::Created, Json(submitted)))
}

#[get("/elections/<election_id>/status")]
async fn vote_status(
    voter: AuthenticatedVoter,
    election_id: ElectionId,
    engine: &State<BallotEngine>,
) -> Result<Json<VoteStatus>> {
    Ok(Json(engine.vote_status(voter.0, election_id).await?))
}
