//! Player registration, login, profile, position, inventory, stats, and the
//! online roster (spec §6).

use crate::api::{AuthRejection, RegistrationRejection, StorageRejection};
use crate::auth::{generate_session_token, hash_password, verify_password, AuthenticatedPlayer};
use crate::state::AppState;
use actix_web::{get, post, web, HttpMessage, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use strata_primitives::{player::is_valid_username, AuthError, RegistrationError};
use strata_store::RegisterPlayer;

const SESSION_DURATION_HOURS: i64 = 24;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    success: bool,
    player_id: i64,
    username: String,
    created_at: String,
}

#[post("/api/v1/players/register")]
pub async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> Result<HttpResponse, actix_web::Error> {
    if !is_valid_username(&body.username) {
        return Err(RegistrationRejection(RegistrationError::InvalidUsername(
            "must match [A-Za-z0-9_]{3,32}".to_string(),
        ))
        .into());
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(RegistrationRejection(RegistrationError::InvalidPassword(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )))
        .into());
    }
    if let Some(email) = &body.email {
        if !email.contains('@') {
            return Err(RegistrationRejection(RegistrationError::InvalidEmail("must contain '@'".to_string())).into());
        }
    }

    let store = state.store.clone();
    let username = body.username.clone();
    let email = body.email.clone();
    let password = body.password.clone();

    let player = web::block(move || -> Result<_, RegistrationRejection> {
        let conn = store.conn().map_err(|e| RegistrationRejection(RegistrationError::InvalidUsername(e.to_string())))?;
        if store.username_exists(&conn, &username).unwrap_or(false) {
            return Err(RegistrationRejection(RegistrationError::UsernameTaken));
        }
        if let Some(email) = &email {
            if store.email_exists(&conn, email).unwrap_or(false) {
                return Err(RegistrationRejection(RegistrationError::EmailTaken));
            }
        }
        let (password_hash, salt) = hash_password(&password)
            .map_err(|_| RegistrationRejection(RegistrationError::InvalidPassword("could not hash password".to_string())))?;
        store
            .create_player(&conn, RegisterPlayer { username, password_hash, salt, email }, chrono::Utc::now())
            .map_err(|e| RegistrationRejection(RegistrationError::InvalidUsername(e.to_string())))
    })
    .await
    .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))??;

    Ok(HttpResponse::Ok().json(RegisterResponse {
        success: true,
        player_id: player.player_id.0,
        username: player.username,
        created_at: player.created_at.to_rfc3339(),
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    session_token: String,
    player: strata_primitives::Player,
    expires_at: String,
}

#[post("/api/v1/players/login")]
pub async fn login(req: HttpRequest, state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse, actix_web::Error> {
    let store = state.store.clone();
    let username = body.username.clone();
    let password = body.password.clone();
    let ip_address = req.connection_info().peer_addr().map(str::to_string);
    let user_agent = req.headers().get("User-Agent").and_then(|v| v.to_str().ok()).map(str::to_string);

    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::hours(SESSION_DURATION_HOURS);

    let (player, token) = web::block(move || -> Result<_, AuthRejection> {
        let conn = store.conn().map_err(|_| AuthRejection(AuthError::InvalidCredentials))?;
        let player = store
            .get_player_by_username(&conn, &username)
            .map_err(|_| AuthRejection(AuthError::InvalidCredentials))?
            .ok_or(AuthRejection(AuthError::InvalidCredentials))?;
        if !verify_password(&password, &player.password_hash) {
            return Err(AuthRejection(AuthError::InvalidCredentials));
        }

        let token = generate_session_token();
        store
            .create_session(&conn, &token, player.player_id, now, expires_at, ip_address.as_deref(), user_agent.as_deref())
            .map_err(|_| AuthRejection(AuthError::InvalidCredentials))?;
        store.set_player_online(&conn, player.player_id, true, now).map_err(|_| AuthRejection(AuthError::InvalidCredentials))?;
        Ok((player, token))
    })
    .await
    .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))??;

    Ok(HttpResponse::Ok().json(LoginResponse { success: true, session_token: token, player, expires_at: expires_at.to_rfc3339() }))
}

#[derive(Serialize)]
struct SimpleSuccess {
    success: bool,
}

#[post("/api/v1/players/logout")]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing bearer token"))?;

    let store = state.store.clone();
    web::block(move || {
        let conn = store.conn()?;
        store.delete_session(&conn, &token)
    })
    .await
    .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
    .map_err(StorageRejection)?;

    Ok(HttpResponse::Ok().json(SimpleSuccess { success: true }))
}

#[derive(Serialize)]
struct MeResponse {
    player: strata_primitives::Player,
    stats: strata_primitives::PlayerStats,
}

pub async fn me(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let player_id = authenticated_player_id(&req)?;
    let store = state.store.clone();

    let (player, stats) = web::block(move || {
        let conn = store.conn()?;
        let player = store.get_player_by_id(&conn, player_id)?.ok_or_else(|| strata_primitives::StorageError::backend("player vanished"))?;
        let stats = store.get_player_stats(&conn, player_id)?;
        Ok::<_, strata_primitives::StorageError>((player, stats))
    })
    .await
    .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
    .map_err(StorageRejection)?;

    Ok(HttpResponse::Ok().json(MeResponse { player, stats }))
}

#[derive(Deserialize)]
pub struct PositionUpdate {
    pub world_x: f64,
    pub world_y: f64,
    pub world_z: f64,
}

pub async fn update_position(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<PositionUpdate>,
) -> Result<HttpResponse, actix_web::Error> {
    let player_id = authenticated_player_id(&req)?;
    let store = state.store.clone();
    let body = body.into_inner();
    let now = chrono::Utc::now();
    let chunk_x = (body.world_x / strata_primitives::CHUNK_SIZE as f64).floor() as i64;
    let chunk_z = (body.world_z / strata_primitives::CHUNK_SIZE as f64).floor() as i64;
    let chunk = strata_primitives::ChunkCoord::new(chunk_x, chunk_z);

    web::block(move || {
        let conn = store.conn()?;
        store.update_player_position(&conn, player_id, body.world_x, body.world_y, body.world_z, chunk, now)
    })
    .await
    .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
    .map_err(StorageRejection)?;

    Ok(HttpResponse::Ok().json(SimpleSuccess { success: true }))
}

pub async fn inventory(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let player_id = authenticated_player_id(&req)?;
    let store = state.store.clone();
    let entries = web::block(move || {
        let conn = store.conn()?;
        store.get_inventory(&conn, player_id)
    })
    .await
    .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
    .map_err(StorageRejection)?;

    Ok(HttpResponse::Ok().json(entries))
}

pub async fn stats(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let player_id = authenticated_player_id(&req)?;
    let store = state.store.clone();
    let stats = web::block(move || {
        let conn = store.conn()?;
        store.get_player_stats(&conn, player_id)
    })
    .await
    .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
    .map_err(StorageRejection)?;

    Ok(HttpResponse::Ok().json(stats))
}

#[get("/api/v1/players/online")]
pub async fn online(state: web::Data<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let store = state.store.clone();
    let players = web::block(move || {
        let conn = store.conn()?;
        store.get_online_players(&conn)
    })
    .await
    .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
    .map_err(StorageRejection)?;

    Ok(HttpResponse::Ok().json(players))
}

fn authenticated_player_id(req: &HttpRequest) -> Result<strata_primitives::PlayerId, actix_web::Error> {
    req.extensions()
        .get::<AuthenticatedPlayer>()
        .map(|p| p.0)
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing authenticated player"))
}

/// Routes reachable without a session (spec §6).
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login).service(logout).service(online);
}

/// Routes gated behind [`crate::auth::SessionAuth`] (spec §6 "Authenticated
/// routes"). Kept separate from [`configure`] since these handlers are bare
/// `async fn`s wired in by the caller under a session-auth-wrapped scope,
/// rather than self-registering `#[get]`/`#[put]` services.
pub fn configure_authenticated(cfg: &mut web::ServiceConfig) {
    use actix_web::web::{get, put};
    cfg.service(web::resource("/api/v1/players/me").route(get().to(me)))
        .service(web::resource("/api/v1/players/me/position").route(put().to(update_position)))
        .service(web::resource("/api/v1/players/me/inventory").route(get().to(inventory)))
        .service(web::resource("/api/v1/players/me/stats").route(get().to(stats)));
}
