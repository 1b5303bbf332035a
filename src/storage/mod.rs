//! Data-access ports for the likes relation and the film catalog.
//!
//! The ranking and recommendation services only read through these traits.
//! Two backends implement all of them: [`InMemoryStorage`] for tests and
//! seeded local runs, and [`PgStorage`] for a Postgres deployment.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::{
    error::AppResult,
    models::{DirectorId, Film, FilmId, GenreId, SearchBy, UserEvent, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryStorage, Seed, SeedLike};
pub use postgres::PgStorage;

/// Read access to the bidirectional user <-> film like relation
///
/// Unknown identifiers are not an error: they simply have no likes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LikesIndex: Send + Sync {
    /// All films the user has liked
    async fn films_liked_by(&self, user: UserId) -> AppResult<HashSet<FilmId>>;

    /// All users who liked the film
    async fn users_who_liked(&self, film: FilmId) -> AppResult<HashSet<UserId>>;

    /// Number of users who liked the film
    async fn like_count(&self, film: FilmId) -> AppResult<usize>;

    /// Like counts for a batch of films. Every requested film has an entry.
    async fn like_counts(&self, films: &[FilmId]) -> AppResult<HashMap<FilmId, usize>> {
        let mut counts = HashMap::with_capacity(films.len());
        for &film in films {
            counts.insert(film, self.like_count(film).await?);
        }
        Ok(counts)
    }
}

/// Read access to film metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FilmCatalog: Send + Sync {
    /// Every film id in the catalog, ascending
    async fn all_films(&self) -> AppResult<Vec<FilmId>>;

    async fn genres_of(&self, film: FilmId) -> AppResult<HashSet<GenreId>>;

    /// Release year, `None` for an unknown film
    async fn release_year(&self, film: FilmId) -> AppResult<Option<i32>>;

    /// Film ids matching the optional genre and release-year filters, ascending
    ///
    /// Genre and year are only looked up for a filter that is present.
    async fn films_matching(
        &self,
        genre: Option<GenreId>,
        year: Option<i32>,
    ) -> AppResult<Vec<FilmId>> {
        let mut matching = Vec::new();
        for film in self.all_films().await? {
            if let Some(genre) = genre {
                if !self.genres_of(film).await?.contains(&genre) {
                    continue;
                }
            }
            if let Some(year) = year {
                if self.release_year(film).await? != Some(year) {
                    continue;
                }
            }
            matching.push(film);
        }
        Ok(matching)
    }

    /// Loads full film records in the order given. Unknown ids are skipped.
    async fn films(&self, ids: Vec<FilmId>) -> AppResult<Vec<Film>>;

    async fn films_by_director(&self, director: DirectorId) -> AppResult<Vec<FilmId>>;

    /// Case-insensitive substring match on film name and/or director name
    async fn search_films(&self, query: &str, by: SearchBy) -> AppResult<Vec<FilmId>>;

    async fn film_exists(&self, film: FilmId) -> AppResult<bool>;

    async fn genre_exists(&self, genre: GenreId) -> AppResult<bool>;

    async fn director_exists(&self, director: DirectorId) -> AppResult<bool>;
}

/// Registered users and their activity feed
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user: UserId) -> AppResult<bool>;

    /// Feed events of the user, oldest first
    async fn feed(&self, user: UserId) -> AppResult<Vec<UserEvent>>;
}

/// Write side of the like relation
///
/// Both operations append a LIKE event to the user's feed.
#[async_trait]
pub trait LikeLedger: Send + Sync {
    /// Records a like. Liking twice keeps a single (user, film) pair.
    async fn add_like(&self, film: FilmId, user: UserId) -> AppResult<()>;

    /// Removes a like. Removing a missing like is a no-op on the relation.
    async fn remove_like(&self, film: FilmId, user: UserId) -> AppResult<()>;
}

/// Everything the HTTP layer needs from a backend
pub trait Storage: LikesIndex + FilmCatalog + UserDirectory + LikeLedger {}

impl<T> Storage for T where T: LikesIndex + FilmCatalog + UserDirectory + LikeLedger {}
