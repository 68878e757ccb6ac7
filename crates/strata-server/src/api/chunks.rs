//! `GET /api/v1/chunks/{x}/{z}/nodes` (spec §6).

use crate::api::StorageRejection;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};

#[get("/api/v1/chunks/{x}/{z}/nodes")]
pub async fn get_chunk_nodes(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, actix_web::Error> {
    let (x_raw, z_raw) = path.into_inner();
    let (x, z) = parse_coords(&x_raw, &z_raw)?;

    let response = state.chunk_service.get_chunk(x, z).await.map_err(StorageRejection)?;
    Ok(HttpResponse::Ok().json(response))
}

fn parse_coords(x_raw: &str, z_raw: &str) -> Result<(i64, i64), actix_web::Error> {
    let x = x_raw
        .parse::<i64>()
        .map_err(|_| actix_web::error::ErrorBadRequest("chunk coordinates must be integers"))?;
    let z = z_raw
        .parse::<i64>()
        .map_err(|_| actix_web::error::ErrorBadRequest("chunk coordinates must be integers"))?;
    Ok((x, z))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_chunk_nodes);
}
