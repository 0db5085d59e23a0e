use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{ChangePasswordRequest, LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse},
    extractors::AuthUser,
    services,
};
use crate::{error::AppError, extract::JsonBody, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/password", put(change_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let id = services::register(state.users.as_ref(), &payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user =
        services::verify_credentials(state.users.as_ref(), &payload.email, &payload.password).await?;
    let access_token = state.signer.sign(user.id, &user.email)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse { access_token }))
}

#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
    }))
}

#[instrument(skip(state, claims, payload), fields(user_id = %claims.sub))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    services::rotate_password(
        state.users.as_ref(),
        claims.sub,
        &payload.current_password,
        &payload.new_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
