//! Checks run before a request reaches the ranking core.
//!
//! The ranker and recommender treat unknown ids as "liked nothing"; the
//! request boundary is where a missing user or film becomes a 404.

use crate::{
    error::{AppError, AppResult},
    models::{DirectorId, FilmId, GenreId, UserId},
    storage::{FilmCatalog, UserDirectory},
};

/// Release year of the first film screening; earlier years cannot match anything
pub const FIRST_FILM_YEAR: i32 = 1895;

pub async fn ensure_user<D>(directory: &D, user: UserId) -> AppResult<()>
where
    D: UserDirectory + ?Sized,
{
    if directory.user_exists(user).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("User {} not found", user)))
    }
}

pub async fn ensure_film<C>(catalog: &C, film: FilmId) -> AppResult<()>
where
    C: FilmCatalog + ?Sized,
{
    if catalog.film_exists(film).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Film {} not found", film)))
    }
}

pub async fn ensure_genre<C>(catalog: &C, genre: GenreId) -> AppResult<()>
where
    C: FilmCatalog + ?Sized,
{
    if catalog.genre_exists(genre).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Genre {} not found", genre)))
    }
}

pub async fn ensure_director<C>(catalog: &C, director: DirectorId) -> AppResult<()>
where
    C: FilmCatalog + ?Sized,
{
    if catalog.director_exists(director).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Director {} not found", director)))
    }
}

/// Rejects release-year filters earlier than [`FIRST_FILM_YEAR`]
pub fn validate_year(year: i32) -> AppResult<i32> {
    if year < FIRST_FILM_YEAR {
        return Err(AppError::InvalidInput(format!(
            "year must be {} or later, got {}",
            FIRST_FILM_YEAR, year
        )));
    }
    Ok(year)
}
