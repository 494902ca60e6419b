use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::database::Database;
use crate::error::{Result, RoomError};
use crate::term::Term;
use crate::wire::{ErrorResponse, FlushRequest, FlushResponse, ForgetParams, ForgetResponse, SelectParams, WireSolution};

pub fn router(db: Database) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE])
        .allow_headers(Any);
    Router::new()
        .route("/facts", get(select).put(flush).delete(forget))
        .route("/facts/all", get(all_facts))
        .layer(cors)
        .with_state(db)
}

// Validation faults are the caller's fault, anything else is ours.
impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status = if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let msg = format!("{self}");
        warn!(%msg, code = %status.as_u16(), "request error");
        let body = ErrorResponse {
            status: "error".into(),
            error: msg,
        };
        (status, Json(body)).into_response()
    }
}

// The store is synchronous, so its work runs on a blocking thread.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RoomError::Execution(format!("join error: {e}")))?
}

async fn select(
    State(db): State<Database>,
    Query(params): Query<SelectParams>,
) -> Result<Json<Vec<WireSolution>>> {
    let started = std::time::Instant::now();
    let patterns: Vec<Vec<Term>> = serde_json::from_str(&params.query).map_err(|e| RoomError::Parse {
        rule: "query".into(),
        input: params.query.clone(),
        message: e.to_string(),
    })?;
    let solutions = blocking(move || db.select_bindings(&patterns)).await?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(ms = elapsed_ms, solutions = solutions.len(), "select complete");
    Ok(Json(solutions))
}

async fn flush(
    State(db): State<Database>,
    Json(request): Json<FlushRequest>,
) -> Result<Json<FlushResponse>> {
    let FlushRequest { client_id, retractions, assertions } = request;
    let outcome = blocking(move || db.apply(&client_id, &retractions, assertions)).await?;
    info!(retracted = outcome.retracted, asserted = outcome.asserted, "flush complete");
    Ok(Json(outcome.into()))
}

async fn forget(
    State(db): State<Database>,
    Query(params): Query<ForgetParams>,
) -> Result<Json<ForgetResponse>> {
    let retracted = blocking(move || match params.name {
        Some(name) => db.retract_everything_about(&name),
        None => db.retract_everything_asserted_by(&params.client_id),
    })
    .await?;
    info!(retracted, "forget complete");
    Ok(Json(ForgetResponse {
        status: "ok".into(),
        retracted,
    }))
}

async fn all_facts(State(db): State<Database>) -> Result<Json<Vec<String>>> {
    let facts = blocking(move || db.all_facts()).await?;
    Ok(Json(facts))
}
