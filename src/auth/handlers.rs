use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        extractors::AuthUser,
        password::{hash_password_async, verify_against_dummy, verify_password_async},
        services::{validate_login, validate_register},
    },
    error::AppError,
    state::AppState,
    users::{NewUser, StoreError},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Mounted under the authenticated `/api` router.
pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let Json(mut payload) = payload?;
    if let Err(e) = validate_register(&mut payload) {
        warn!(error = %e, "register rejected");
        return Err(e);
    }

    let password_hash = hash_password_async(payload.password).await?;

    let new_user = NewUser {
        name: payload.name,
        email: payload.email,
        password_hash,
        role: state.config.role_policy.assignment(),
    };

    let user = match state.users.create(new_user).await {
        Ok(u) => u,
        Err(StoreError::DuplicateEmail) => {
            warn!("email already registered");
            return Err(AppError::DuplicateEmail);
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(mut payload) = payload?;
    validate_login(&mut payload)?;

    // Unknown email and wrong password must look the same from outside:
    // same error, and both pay for one argon2 verification.
    let user = match state.users.find_by_email(&payload.email).await {
        Ok(u) => u,
        Err(StoreError::NotFound) => {
            verify_against_dummy(payload.password).await;
            warn!("login for unknown email");
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password_async(payload.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.issue(user.id, &user.role)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id, role = %auth.role))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.find_by_id(auth.id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound("user not found"),
        other => other.into(),
    })?;
    Ok(Json(user.into()))
}
