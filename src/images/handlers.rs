use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{ImageBody, ImageView, PatchBody, ReconcileResponse};
use crate::{auth::extractors::AuthUser, error::AppError, extract::JsonBody, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/images", get(list_images))
        .route("/images/:id", get(get_image))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/images", post(create_image))
        .route(
            "/images/:id",
            axum::routing::put(replace_image)
                .patch(patch_image)
                .delete(delete_image),
        )
        .route("/images/:id/reconcile", post(reconcile_image))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}

#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn list_images(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<ImageView>>, AppError> {
    let records = state.images.list(&claims).await?;
    Ok(Json(records.into_iter().map(ImageView::from).collect()))
}

#[instrument(skip(state, _claims))]
pub async fn get_image(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ImageView>, AppError> {
    Ok(Json(state.images.get_one(&id).await?.into()))
}

#[instrument(skip(state, claims, body), fields(user_id = %claims.sub))]
pub async fn create_image(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    JsonBody(body): JsonBody<ImageBody>,
) -> Result<(StatusCode, HeaderMap, Json<ImageView>), AppError> {
    let record = state.images.create(&claims, body.into()).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/images/{}", record.id))
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(record.into())))
}

#[instrument(skip(state, claims, body), fields(user_id = %claims.sub))]
pub async fn replace_image(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ImageBody>,
) -> Result<StatusCode, AppError> {
    state.images.replace(&id, &claims, body.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, claims, body), fields(user_id = %claims.sub))]
pub async fn patch_image(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<PatchBody>,
) -> Result<StatusCode, AppError> {
    state.images.partial_update(&id, &claims, body.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn delete_image(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.images.delete(&id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn reconcile_image(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let outcome = state.images.reconcile(&id, &claims).await?;
    Ok(Json(outcome.into()))
}
