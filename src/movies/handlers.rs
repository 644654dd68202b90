use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;

use super::{
    dto::{ListParams, MoviePage},
    query::ListingQuery,
    repo_types::Movie,
    services,
};
use crate::{auth::dto::MessageResponse, error::AppResult, state::AppState};

pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/:id", get(get_movie).put(update_movie))
}

#[instrument(skip(state))]
pub async fn list_movies(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<MoviePage>> {
    let Query(params) = params?;
    let query = ListingQuery::from_params(&params)?;
    let page = services::list(state.movies.as_ref(), &query).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Movie>> {
    let movie = services::get_by_id(state.movies.as_ref(), &id).await?;
    Ok(Json(movie))
}

#[instrument(skip(state, body))]
pub async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(body) = body?;
    services::update_partial(state.movies.as_ref(), &id, body).await?;
    Ok(Json(MessageResponse::new("Movie updated")))
}
