use axum::{Json, extract::State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::load;
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{RegisterUserRequest, User, require_text},
    response::ApiResponse,
    store::{Collection, UniqueKey, from_document, to_document},
};

/// Identity provider signup response; only the new user's id is needed.
#[derive(Deserialize)]
struct SignupResponse {
    id: Uuid,
}

/// register_user
///
/// Creates the account with the identity provider, then mirrors it into `users`
/// under the provider's id. Emails are unique: a second registration is a 409.
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Rejected by the identity provider"),
        (status = 409, description = "Email already registered"),
        (status = 503, description = "Identity provider unavailable")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    let username = require_text(&payload.username, "Username is required")?.to_lowercase();
    let email = require_text(&payload.email, "Email is required")?.to_lowercase();
    let full_name = require_text(&payload.full_name, "Full name is required")?;

    let (Some(identity_url), Some(identity_key)) =
        (&state.config.identity_url, &state.config.identity_key)
    else {
        return Err(ApiError::Unavailable(
            "identity provider is not configured".to_string(),
        ));
    };

    let response = reqwest::Client::new()
        .post(format!("{}/auth/v1/signup", identity_url.trim_end_matches('/')))
        .header("apikey", identity_key)
        .json(&json!({ "email": email, "password": payload.password }))
        .send()
        .await
        .map_err(|e| ApiError::Unavailable(format!("identity provider unreachable: {}", e)))?;

    if !response.status().is_success() {
        tracing::info!(status = %response.status(), "identity provider rejected signup");
        return Err(ApiError::invalid("Registration was rejected by the identity provider"));
    }

    let signup = response
        .json::<SignupResponse>()
        .await
        .map_err(|e| ApiError::Unavailable(format!("unexpected identity response: {}", e)))?;

    let user = User {
        id: signup.id,
        username,
        email: email.clone(),
        full_name,
        avatar: None,
        cover_image: None,
        created_at: Utc::now(),
    };

    let key = UniqueKey::new(vec![("email", json!(email))]);
    let stored = state
        .store
        .insert_unique(Collection::Users, &key, to_document(&user)?)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("Email is already registered".to_string()),
            other => other,
        })?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(ApiResponse::created(
        from_document(stored)?,
        "User registered successfully",
    ))
}

/// get_me
///
/// The authenticated user's profile.
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<User>> {
    let user: User = load(&state.store, Collection::Users, id, "User").await?;
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}
