//! `POST /api/v1/nodes/{nodeId}/harvest` (spec §6).

use crate::api::ApiError;
use crate::auth::AuthenticatedPlayer;
use crate::state::AppState;
use actix_web::{post, web, HttpMessage, HttpRequest, HttpResponse};
use strata_primitives::NodeId;

#[post("/api/v1/nodes/{node_id}/harvest")]
pub async fn harvest(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, actix_web::Error> {
    let player = req
        .extensions()
        .get::<AuthenticatedPlayer>()
        .copied()
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing authenticated player"))?;

    let node_id = NodeId(path.into_inner());
    let result = state.harvest_engine.harvest(player.0, node_id).await.map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(result))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(harvest);
}
