use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::dto::{LoginRequest, SetPasswordRequest},
    error::ApiError,
    extractors::JsonBody,
    state::AppState,
    users::repo_types::User,
};

pub fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/user/set_password", post(set_password))
        .route("/user/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn set_password(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SetPasswordRequest>,
) -> Result<Json<User>, ApiError> {
    let (Some(id), Some(password)) = (payload.id, payload.password) else {
        warn!("set_password without id or password");
        return Err(ApiError::BadRequest("id and password are required".into()));
    };

    // existence check precedes hashing
    if state.users.get(id).await?.is_none() {
        warn!(user_id = id, "set_password for unknown user");
        return Err(ApiError::NotFound("User not found".into()));
    }

    let hash = state.hasher.hash_blocking(password).await?;
    let user = state.users.set_password(id, &hash).await?;

    info!(user_id = id, "password set");
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<User>, ApiError> {
    let (Some(id), Some(password)) = (payload.id, payload.password) else {
        warn!("login without id or password");
        return Err(ApiError::invalid_credentials());
    };

    let Some(user) = state.users.get(id).await? else {
        warn!(user_id = id, "login unknown user");
        return Err(ApiError::invalid_credentials());
    };

    let Some(stored) = user.password.clone() else {
        warn!(user_id = id, "login for user without password");
        return Err(ApiError::invalid_credentials());
    };

    if !state.hasher.verify_blocking(password, stored).await? {
        warn!(user_id = id, "login invalid password");
        return Err(ApiError::invalid_credentials());
    }

    info!(user_id = id, "user logged in");
    Ok(Json(user))
}
