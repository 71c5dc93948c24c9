use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::User,
    store::{Collection, Predicate, StoreState, from_document},
};

/// Claims
///
/// The JWT payload issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID, which is also the `_id` of their `users` document.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// AuthUser
///
/// The resolved actor of an authenticated request. Handlers take it as an
/// argument and use `id` for every ownership check.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// Looks the actor up in `users`. A store failure is a 503, an unknown user a 401.
async fn resolve(store: &StoreState, id: Uuid) -> Result<AuthUser, StatusCode> {
    let doc = store
        .find_one(Collection::Users, &Predicate::id(id))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "user lookup failed during authentication");
            StatusCode::SERVICE_UNAVAILABLE
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user: User = from_document(doc).map_err(|e| {
        tracing::error!(error = %e, user_id = %id, "stored user is unreadable");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(AuthUser {
        id: user.id,
        username: user.username,
    })
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user is accepted.
/// 2. Otherwise a `Bearer` HS256 token is decoded with the configured secret (expiry enforced).
/// 3. The subject must still exist in `users`.
///
/// Rejection: 401 on any authentication failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    StoreState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = StoreState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());
            if let Some(user_id) = bypass {
                if let Ok(user) = resolve(&store, user_id).await {
                    return Ok(user);
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            StatusCode::UNAUTHORIZED
        })?;

        resolve(&store, token_data.claims.sub).await
    }
}
