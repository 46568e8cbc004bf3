use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    state::AppState,
    users::{
        dto::{LoginRequest, PublicUser, UserForm},
        repo_types::{RepoError, User},
    },
};

type ApiError = (StatusCode, String);

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/login", post(login))
        .route("/users/account/:account", get(get_user_by_account))
        .route("/users/:id", get(get_user).put(update_user))
}

fn internal<E: std::fmt::Display>(e: E) -> ApiError {
    error!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".into(),
    )
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "User not found".into())
}

fn conflict() -> ApiError {
    (StatusCode::CONFLICT, "Account already registered".into())
}

fn public(user: User) -> Result<PublicUser, ApiError> {
    PublicUser::try_from(user).map_err(internal)
}

/// Storage holds `account` unique. A write that lost a race for the account
/// fails like any other storage error, so look again before calling it a 500.
async fn conflict_or_internal(
    state: &AppState,
    account: &str,
    id: Option<i64>,
    e: RepoError,
) -> ApiError {
    match state.users.find_by_account(account).await {
        Ok(Some(owner)) if owner.id != id => {
            warn!(account, owner_id = ?owner.id, "account taken concurrently");
            conflict()
        }
        _ => internal(e),
    }
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(mut payload): Json<UserForm>,
) -> Result<(StatusCode, HeaderMap, Json<PublicUser>), ApiError> {
    if let Err(msg) = payload.normalize() {
        warn!(account = %payload.account, reason = msg, "rejected user form");
        return Err((StatusCode::BAD_REQUEST, msg.into()));
    }

    if state
        .users
        .find_by_account(&payload.account)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(account = %payload.account, "account already registered");
        return Err(conflict());
    }

    let user = payload.into_user().map_err(internal)?;
    if let Err(e) = state.users.insert(&user).await {
        return Err(conflict_or_internal(&state, &user.account, None, e).await);
    }

    let stored = state
        .users
        .find_by_account(&user.account)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal(format!("user {} vanished after insert", user.account)))?;
    let body = public(stored)?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/users/{}", body.id).parse() {
        headers.insert(header::LOCATION, location);
    }

    info!(user_id = body.id, account = %body.account, "user created");
    Ok((StatusCode::CREATED, headers, Json(body)))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.users.find_all().await.map_err(internal)?;
    let items = users
        .into_iter()
        .map(public)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .users
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(not_found)?;
    Ok(Json(public(user)?))
}

#[instrument(skip(state))]
pub async fn get_user_by_account(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .users
        .find_by_account(&account)
        .await
        .map_err(internal)?
        .ok_or_else(not_found)?;
    Ok(Json(public(user)?))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UserForm>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Err(msg) = payload.normalize() {
        warn!(user_id = id, reason = msg, "rejected user form");
        return Err((StatusCode::BAD_REQUEST, msg.into()));
    }

    if state.users.find_by_id(id).await.map_err(internal)?.is_none() {
        return Err(not_found());
    }

    if let Some(owner) = state
        .users
        .find_by_account(&payload.account)
        .await
        .map_err(internal)?
    {
        if owner.id != Some(id) {
            warn!(user_id = id, account = %payload.account, "account taken by another user");
            return Err(conflict());
        }
    }

    let user = payload.into_user().map_err(internal)?.with_id(id);
    if let Err(e) = state.users.update(&user).await {
        return Err(conflict_or_internal(&state, &user.account, Some(id), e).await);
    }

    // The row may have been deleted since the existence check
    let stored = state
        .users
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(user_id = id, "user gone before update landed");
            not_found()
        })?;

    info!(user_id = id, "user updated");
    Ok(Json(public(stored)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    payload.account = payload.account.trim().to_string();

    let user = match state.users.find_by_account(&payload.account).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(account = %payload.account, "login unknown account");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(internal(e)),
    };

    let ok = user.password_matches(&payload.password).map_err(internal)?;
    if !ok {
        warn!(account = %payload.account, user_id = ?user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(user_id = ?user.id, "user logged in");
    Ok(Json(public(user)?))
}
