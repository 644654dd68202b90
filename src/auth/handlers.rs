use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, MessageResponse, PublicUser, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        services,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let Json(payload) = payload?;
    services::register(state.users.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("User created"))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let res = services::login(state.users.as_ref(), &keys, payload).await?;
    Ok(Json(res))
}

#[instrument(skip_all)]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state.users.find_by_id(claims.user_id).await?.ok_or_else(|| {
        warn!(user_id = %claims.user_id, "token for unknown user");
        AppError::Unauthorized("User not found".into())
    })?;
    Ok(Json(PublicUser::from(&user)))
}
