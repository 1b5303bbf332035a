use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{DirectorId, DirectorSort, Film, FilmId, GenreId, SearchBy, UserEvent, UserId},
    services::{
        existence::{ensure_director, ensure_genre, ensure_user, validate_year},
        likes, PopularityRanker, Recommender, DEFAULT_TOP_COUNT,
    },
    storage::{FilmCatalog, UserDirectory},
};

use super::extract::{ApiPath, ApiQuery};
use super::AppState;

// Query parameters

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularQuery {
    #[serde(default = "default_count")]
    pub count: i64,
    pub genre_id: Option<GenreId>,
    pub year: Option<i32>,
}

fn default_count() -> i64 {
    DEFAULT_TOP_COUNT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonQuery {
    pub user_id: UserId,
    pub friend_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorQuery {
    pub sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub by: String,
}

/// Loads full records for ranked ids, keeping the ranking order
async fn hydrate(state: &AppState, ids: Vec<FilmId>) -> AppResult<Json<Vec<Film>>> {
    let films = state.storage.films(ids).await?;
    Ok(Json(films))
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Most liked films, optionally by genre and release year
pub async fn popular_films(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<PopularQuery>,
) -> AppResult<Json<Vec<Film>>> {
    tracing::info!(
        request_id = %request_id,
        count = params.count,
        genre_id = ?params.genre_id,
        year = ?params.year,
        "Ranking popular films"
    );

    if let Some(genre) = params.genre_id {
        ensure_genre(&*state.storage, genre).await?;
    }
    let year = params.year.map(validate_year).transpose()?;

    let storage = &*state.storage;
    let ids = PopularityRanker::new(storage, storage)
        .top_films(params.count, params.genre_id, year)
        .await?;

    hydrate(&state, ids).await
}

/// Films liked by both users
pub async fn common_films(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<CommonQuery>,
) -> AppResult<Json<Vec<Film>>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %params.user_id,
        friend_id = %params.friend_id,
        "Finding common films"
    );

    let storage = &*state.storage;
    ensure_user(storage, params.user_id).await?;
    ensure_user(storage, params.friend_id).await?;

    let ids = PopularityRanker::new(storage, storage)
        .common_films(params.user_id, params.friend_id)
        .await?;

    hydrate(&state, ids).await
}

/// A director's films sorted by `year` (default) or `likes`
pub async fn director_films(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(director): ApiPath<DirectorId>,
    ApiQuery(params): ApiQuery<DirectorQuery>,
) -> AppResult<Json<Vec<Film>>> {
    let sort = match params.sort_by.as_deref() {
        Some(raw) => raw.parse::<DirectorSort>()?,
        None => DirectorSort::Year,
    };

    tracing::info!(
        request_id = %request_id,
        director_id = %director,
        sort = ?sort,
        "Listing director films"
    );

    let storage = &*state.storage;
    ensure_director(storage, director).await?;

    let films = PopularityRanker::new(storage, storage)
        .director_films(director, sort)
        .await?;

    Ok(Json(films))
}

/// Substring search over film titles and/or director names
///
/// A blank query returns the overall top without looking at `by`.
pub async fn search_films(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<Film>>> {
    let by = if params.query.trim().is_empty() {
        SearchBy::default()
    } else {
        params.by.parse()?
    };

    tracing::info!(
        request_id = %request_id,
        query = %params.query,
        by = %params.by,
        "Searching films"
    );

    let storage = &*state.storage;
    let ids = PopularityRanker::new(storage, storage)
        .search(&params.query, by)
        .await?;

    hydrate(&state, ids).await
}

pub async fn add_like(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath((film, user)): ApiPath<(FilmId, UserId)>,
) -> AppResult<StatusCode> {
    tracing::info!(request_id = %request_id, film_id = %film, user_id = %user, "Adding like");

    likes::add_like(&*state.storage, film, user).await?;
    Ok(StatusCode::OK)
}

pub async fn remove_like(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath((film, user)): ApiPath<(FilmId, UserId)>,
) -> AppResult<StatusCode> {
    tracing::info!(request_id = %request_id, film_id = %film, user_id = %user, "Removing like");

    likes::remove_like(&*state.storage, film, user).await?;
    Ok(StatusCode::OK)
}

/// Films liked by the user's closest taste neighbours, ascending id
pub async fn recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(user): ApiPath<UserId>,
) -> AppResult<Json<Vec<Film>>> {
    tracing::info!(request_id = %request_id, user_id = %user, "Computing recommendations");

    let storage = &*state.storage;
    ensure_user(storage, user).await?;

    let recommended = Recommender::new(storage).recommendations_for(user).await?;

    hydrate(&state, recommended.into_iter().collect()).await
}

/// The user's like/unlike history, oldest first
pub async fn feed(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(user): ApiPath<UserId>,
) -> AppResult<Json<Vec<UserEvent>>> {
    tracing::info!(request_id = %request_id, user_id = %user, "Loading feed");

    let storage = &*state.storage;
    ensure_user(storage, user).await?;

    Ok(Json(storage.feed(user).await?))
}
