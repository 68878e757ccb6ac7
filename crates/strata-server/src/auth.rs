//! Password hashing, session issuance, and bearer-token middleware (spec
//! §11 "Player registration/login/session issuance"). This is the thin
//! "authentication module" named as an external collaborator in spec §1 —
//! it exists so the repository runs end to end, and stays deliberately
//! simple; none of the engine's complexity lives here.

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::rc::Rc;
use strata_primitives::{AuthError, PlayerId};
use strata_store::Store;

pub fn hash_password(password: &str) -> Result<(String, String), argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok((hash.to_string(), salt.as_str().to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else { return false };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

/// Bearer token format: URL-safe base64 of 32 random bytes (spec §6 "Bearer
/// token format").
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The authenticated identity injected into request extensions by
/// [`SessionAuth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedPlayer(pub PlayerId);

fn extract_bearer_token(req: &ServiceRequest) -> Result<String, AuthError> {
    let header = req.headers().get("Authorization").ok_or(AuthError::UnauthenticatedSession)?;
    let value = header.to_str().map_err(|_| AuthError::InvalidToken)?;
    value.strip_prefix("Bearer ").map(str::to_string).ok_or(AuthError::InvalidToken)
}

/// `actix-web` middleware that loads the session for a bearer token, checks
/// expiry, and injects [`AuthenticatedPlayer`] into request extensions
/// (spec §11).
pub struct SessionAuth {
    store: Store,
}

impl SessionAuth {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthMiddleware { service: Rc::new(service), store: self.store.clone() }))
    }
}

pub struct SessionAuthMiddleware<S> {
    service: Rc<S>,
    store: Store,
}

impl<S, B> Service<ServiceRequest> for SessionAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let store = self.store.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let token = match extract_bearer_token(&req) {
                Ok(t) => t,
                Err(e) => return Err(crate::api::AuthRejection(e).into()),
            };

            let session = tokio::task::spawn_blocking(move || {
                let conn = store.conn().map_err(|_| AuthError::UnauthenticatedSession)?;
                store.get_session(&conn, &token).map_err(|_| AuthError::UnauthenticatedSession)
            })
            .await
            .map_err(|_| crate::api::AuthRejection(AuthError::UnauthenticatedSession))?;

            let session = match session {
                Ok(Some(s)) => s,
                Ok(None) => return Err(crate::api::AuthRejection(AuthError::InvalidToken).into()),
                Err(_) => return Err(crate::api::AuthRejection(AuthError::UnauthenticatedSession).into()),
            };

            if session.is_expired(chrono::Utc::now()) {
                return Err(crate::api::AuthRejection(AuthError::ExpiredSession).into());
            }

            req.extensions_mut().insert(AuthenticatedPlayer(session.player_id));
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trips_through_hash_and_verify() {
        let (hash, _salt) = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn session_tokens_are_32_bytes_of_url_safe_base64() {
        let token = generate_session_token();
        let decoded = URL_SAFE_NO_PAD.decode(&token).unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn session_tokens_are_not_repeated() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
    }
}
