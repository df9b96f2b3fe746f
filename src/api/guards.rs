use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};

use crate::error::Error;
use crate::model::common::VoterId;
use crate::service::ClientInfo;

/// Header in which the upstream authentication layer passes the voter's ID.
pub const VOTER_HEADER: &str = "X-Voter-Id";

/// The voter making the request, as vouched for by the authentication layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuthenticatedVoter(pub VoterId);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedVoter {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(value) = req.headers().get_one(VOTER_HEADER) else {
            return Outcome::Error((
                Status::Unauthorized,
                Error::Unauthorized(format!("Missing {VOTER_HEADER} header")),
            ));
        };
        match value.trim().parse::<VoterId>() {
            Ok(id) => Outcome::Success(AuthenticatedVoter(id)),
            Err(_) => Outcome::Error((
                Status::Unauthorized,
                Error::Unauthorized(format!("Malformed {VOTER_HEADER} header")),
            )),
        }
    }
}

/// The submitting client's address and user agent. Never fails.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientInfo {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(ClientInfo {
            ip_address: req.client_ip().map(|ip| ip.to_string()),
            user_agent: req.headers().get_one("User-Agent").map(str::to_string),
        })
    }
}
