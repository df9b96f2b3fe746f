use rocket::{http::Status, serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::api::{OwnVotes, ReceiptCodeRequest, ReceiptVerification};
use crate::service::BallotEngine;

use super::AuthenticatedVoter;

pub fn routes() -> Vec<Route> {
    routes![verify_receipt, own_votes]
}

/// Public. A code that does not verify gets a 404 with `"valid": false`.
#[post("/receipts/verify", data = "<request>", format = "json")]
async fn verify_receipt(
    request: Json<ReceiptCodeRequest>,
    engine: &State<BallotEngine>,
) -> Result<(Status, Json<ReceiptVerification>)> {
    let verification = engine.verify_receipt(&request.receipt_code).await?;
    let status = if verification.valid {
        Status::Ok
    } else {
        Status::NotFound
    };
    Ok((status, Json(verification)))
}

#[post("/receipts/votes", data = "<request>", format = "json")]
async fn own_votes(
    voter: AuthenticatedVoter,
    request: Json<ReceiptCodeRequest>,
    engine: &State<BallotEngine>,
) -> Result<Json<OwnVotes>> {
    Ok(Json(
        engine
            .votes_for_receipt(voter.0, &request.receipt_code)
            .await?,
    ))
}
