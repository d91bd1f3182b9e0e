use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use models::user::{Message, SavedUser, UserInput, UserList, UserRecord};

use crate::errors::JsonApiError;
use crate::routes::ServerState;

/// Save user data with email as key.
///
/// Creates the record or replaces every field of an existing one.
#[utoipa::path(
    post, path = "/user", tag = "users",
    request_body = UserInput,
    responses(
        (status = 200, description = "Saved", body = SavedUser),
        (status = 400, description = "Missing email or name"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn save_user(
    State(state): State<ServerState>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> Result<Json<SavedUser>, JsonApiError> {
    let Json(input) = payload.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
    Ok(Json(state.users.upsert(input).await?))
}

/// Get user data by email.
#[utoipa::path(
    get, path = "/user/{email}", tag = "users",
    params(("email" = String, Path, description = "Email address the record is stored under")),
    responses(
        (status = 200, description = "Found", body = UserRecord),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<ServerState>,
    Path(email): Path<String>,
) -> Result<Json<UserRecord>, JsonApiError> {
    Ok(Json(state.users.get(&email).await?))
}

/// Get all users.
#[utoipa::path(
    get, path = "/users", tag = "users",
    responses((status = 200, description = "Every stored user keyed by email", body = UserList))
)]
pub async fn get_all_users(State(state): State<ServerState>) -> Result<Json<UserList>, JsonApiError> {
    Ok(Json(state.users.list().await?))
}

/// Delete user by email.
#[utoipa::path(
    delete, path = "/user/{email}", tag = "users",
    params(("email" = String, Path, description = "Email address the record is stored under")),
    responses(
        (status = 200, description = "Deleted", body = Message),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<ServerState>,
    Path(email): Path<String>,
) -> Result<Json<Message>, JsonApiError> {
    Ok(Json(state.users.delete(&email).await?))
}
