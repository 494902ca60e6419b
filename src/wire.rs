// Bodies exchanged between a remote client and the server. Terms travel in
// their single-key object form (see `Term::to_wire`).

use serde::{Deserialize, Serialize};

use crate::store::FlushOutcome;
use crate::term::Term;
use crate::unify::Bindings;

/// A solution as it travels: variable name to bound term.
pub type WireSolution = Bindings;

/// Query string of `GET /facts`; `query` is a JSON array of term sequences.
#[derive(Debug, Serialize, Deserialize)]
pub struct SelectParams {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushRequest {
    pub client_id: String,
    #[serde(default)]
    pub retractions: Vec<Vec<Term>>,
    #[serde(default)]
    pub assertions: Vec<Vec<Term>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlushResponse {
    pub status: String,
    pub retracted: usize,
    pub asserted: usize,
}
impl From<FlushOutcome> for FlushResponse {
    fn from(outcome: FlushOutcome) -> Self {
        Self {
            status: "ok".into(),
            retracted: outcome.retracted,
            asserted: outcome.asserted,
        }
    }
}
impl From<FlushResponse> for FlushOutcome {
    fn from(response: FlushResponse) -> Self {
        Self {
            retracted: response.retracted,
            asserted: response.asserted,
        }
    }
}

/// Query string of `DELETE /facts`. With a `name` every fact about that
/// identifier goes, without one every fact the client asserted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgetParams {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForgetResponse {
    pub status: String,
    pub retracted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}
