use rocket::{
    http::Status,
    serde::json::{serde_json::json, Value},
    Catcher, Request, Route,
};

mod guards;
mod receipts;
mod results;
mod voting;

pub use guards::{AuthenticatedVoter, VOTER_HEADER};

pub fn routes() -> Vec<Route> {
    let mut routes = routes![health];
    routes.extend(voting::routes());
    routes.extend(receipts::routes());
    routes.extend(results::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

#[get("/health")]
fn health() -> Value {
    json!({ "status": "ok" })
}

/// Give failures that never reached a handler, e.g. a missing voter header
/// or a malformed body, the same JSON shape as handler errors.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Value) {
    let kind = match status.code {
        401 => "unauthorized",
        404 => "not_found",
        400 | 422 => "bad_request",
        _ => "error",
    };
    (
        status,
        json!({
            "error": kind,
            "detail": status.reason_lossy(),
        }),
    )
}
