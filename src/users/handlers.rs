use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::ApiError,
    extractors::{JsonBody, PathParam},
    state::AppState,
    users::{
        dto::{Cleared, CreateUserRequest, Deleted, UpdateUserRequest, UserList},
        repo_types::User,
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(read_user).patch(update_user).delete(delete_user),
        )
}

/// Destructive routes, only mounted in maintenance mode.
pub fn maintenance_routes() -> Router<AppState> {
    Router::new().route("/users/clear", post(clear_users))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let new = services::new_user(payload)?;
    let user = state.users.create(new).await?;
    info!(user_id = user.id, username = %user.username, "user created");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserList>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(UserList { users }))
}

#[instrument(skip(state))]
pub async fn read_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<User>, ApiError> {
    match state.users.get(id).await? {
        Some(user) => Ok(Json(user)),
        None => {
            warn!(user_id = id, "user not found");
            Err(ApiError::NotFound("User not found".into()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let changes = services::user_changes(id, payload)?;
    if changes.is_empty() {
        let user = state
            .users
            .get(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        debug!(user_id = id, "empty patch, nothing written");
        return Ok(Json(user));
    }

    let user = state.users.update(id, changes).await?;
    info!(user_id = id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Deleted>, ApiError> {
    state.users.delete(id).await?;
    info!(user_id = id, "user deleted");
    Ok(Json(Deleted { deleted: true }))
}

#[instrument(skip(state))]
pub async fn clear_users(State(state): State<AppState>) -> Result<Json<Cleared>, ApiError> {
    state.users.reset().await?;
    warn!("user store cleared");
    Ok(Json(Cleared { cleared: true }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{
        app::build_app,
        state::AppState,
        test_support::{send, CapturedLogs},
    };

    #[tokio::test]
    async fn create_user_returns_record_without_password() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "Admin", "email": "email@email.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "Admin");
        assert_eq!(body["email"], "email@email.com");
        assert!(body["id"].as_i64().is_some());
        assert!(body["password"].is_null());
    }

    #[tokio::test]
    async fn create_user_incomplete_or_invalid_is_422() {
        let app = build_app(AppState::fake());
        let (status, _) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"name": "Deadpond"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "deadpond", "email": {"message": "Not okey!"}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn create_with_taken_id_is_conflict() {
        let app = build_app(AppState::fake());
        let user = json!({"id": 5, "username": "five", "email": "five@email.com"});
        let (status, body) = send(&app, Method::POST, "/users/", Some(user.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 5);

        let (status, _) = send(&app, Method::POST, "/users/", Some(user)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn read_users_lists_in_insertion_order() {
        let app = build_app(AppState::fake());
        for (name, email) in [("deadpond", "dive@email.com"), ("rustyman", "rusty@email.com")] {
            send(
                &app,
                Method::POST,
                "/users/",
                Some(json!({"username": name, "email": email})),
            )
            .await;
        }
        let (status, body) = send(&app, Method::GET, "/users/", None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["username"], "deadpond");
    }

    #[tokio::test]
    async fn create_then_read_roundtrips() {
        let app = build_app(AppState::fake());
        let (_, created) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "deadpond", "email": "dive@email.com", "fullname": "Dive Wilson"})),
        )
        .await;
        let (status, read) = send(
            &app,
            Method::GET,
            &format!("/users/{}", created["id"]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn read_missing_user_is_404_not_null() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, Method::GET, "/users/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "User not found");
    }

    #[tokio::test]
    async fn non_numeric_id_is_422_with_detail() {
        let app = build_app(AppState::fake());
        for method in [Method::GET, Method::DELETE] {
            let (status, body) = send(&app, method, "/users/abc", None).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert!(body["detail"]
                .as_str()
                .unwrap()
                .starts_with("Invalid path parameter"));
        }
        let (status, body) = send(
            &app,
            Method::PATCH,
            "/users/abc",
            Some(json!({"username": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn largest_explicit_id_is_422_and_generation_continues() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"id": 9223372036854775807_i64, "username": "max", "email": "m@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "next", "email": "n@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
    }

    #[tokio::test]
    async fn fields_are_stored_as_submitted() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": " Admin ", "email": "Foo@B.com", "fullname": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], " Admin ");
        assert_eq!(body["email"], "Foo@B.com");
        assert_eq!(body["fullname"], "");

        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "a", "email": "email"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "email");
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields_and_is_idempotent() {
        let app = build_app(AppState::fake());
        let (_, created) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "Deadpond", "email": "dive@email.com", "fullname": "Dive"})),
        )
        .await;
        let uri = format!("/users/{}", created["id"]);
        let patch = json!({"username": "deadpuddle"});

        let (status, first) = send(&app, Method::PATCH, &uri, Some(patch.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["username"], "deadpuddle");
        assert_eq!(first["email"], "dive@email.com");
        assert_eq!(first["fullname"], "Dive");

        let (_, second) = send(&app, Method::PATCH, &uri, Some(patch)).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_patch_reports_no_write() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let app = build_app(AppState::fake());
        let (_, created) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "Deadpond", "email": "dive@email.com"})),
        )
        .await;
        let uri = format!("/users/{}", created["id"]);

        let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, created);
        let out = logs.contents();
        assert!(out.contains("empty patch, nothing written"));
        assert!(!out.contains("user updated"));

        send(&app, Method::PATCH, &uri, Some(json!({"fullname": "Dive"}))).await;
        assert!(logs.contents().contains("user updated"));
    }

    #[tokio::test]
    async fn update_rejects_bad_shapes_and_missing_users() {
        let app = build_app(AppState::fake());
        let (status, _) = send(
            &app,
            Method::PATCH,
            "/users/42",
            Some(json!({"username": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, created) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "Deadpond", "email": "dive@email.com"})),
        )
        .await;
        let uri = format!("/users/{}", created["id"]);
        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({"email": 12}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({"id": 77}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn delete_then_read_and_delete_again_are_404() {
        let app = build_app(AppState::fake());
        let (_, created) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "Deadpond", "email": "dive@email.com"})),
        )
        .await;
        let uri = format!("/users/{}", created["id"]);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"deleted": true}));

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn clear_is_not_routed_outside_maintenance_mode() {
        let app = build_app(AppState::fake());
        send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "keep", "email": "keep@email.com"})),
        )
        .await;
        let (status, _) = send(&app, Method::POST, "/users/clear", None).await;
        assert!(status.is_client_error());
        let (_, body) = send(&app, Method::GET, "/users/", None).await;
        assert_eq!(body["users"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_wipes_users_in_maintenance_mode() {
        let app = build_app(AppState::fake_with_maintenance());
        send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "gone", "email": "gone@email.com"})),
        )
        .await;
        let (status, body) = send(&app, Method::POST, "/users/clear", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"cleared": true}));
        let (_, body) = send(&app, Method::GET, "/users/", None).await;
        assert!(body["users"].as_array().unwrap().is_empty());
    }
}
