use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        Director, DirectorId, EventType, Film, FilmId, Genre, GenreId, Operation, SearchBy,
        UserEvent, UserId,
    },
};

use super::{FilmCatalog, LikeLedger, LikesIndex, UserDirectory};

/// A single (user, film) pair in a seed file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedLike {
    pub user_id: UserId,
    pub film_id: FilmId,
}

/// Initial dataset for the in-memory backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub genres: Vec<Genre>,
    pub directors: Vec<Director>,
    pub films: Vec<Film>,
    pub users: Vec<UserId>,
    pub likes: Vec<SeedLike>,
}

/// In-memory backend
///
/// Keeps both views of the like relation (film -> users, user -> films) and
/// updates them under a single write lock so they never diverge.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    films: BTreeMap<FilmId, Film>,
    users: BTreeSet<UserId>,
    genres: BTreeMap<GenreId, Genre>,
    directors: BTreeMap<DirectorId, Director>,
    likes_by_film: HashMap<FilmId, HashSet<UserId>>,
    likes_by_user: HashMap<UserId, HashSet<FilmId>>,
    feed: Vec<UserEvent>,
}

impl Inner {
    fn insert_film(&mut self, film: Film) {
        for genre in &film.genres {
            self.genres.entry(genre.id).or_insert_with(|| genre.clone());
        }
        for director in &film.directors {
            self.directors
                .entry(director.id)
                .or_insert_with(|| director.clone());
        }
        self.films.insert(film.id, film);
    }

    /// Returns true when the pair was not present before
    fn link(&mut self, film: FilmId, user: UserId) -> bool {
        let added = self.likes_by_film.entry(film).or_default().insert(user);
        self.likes_by_user.entry(user).or_default().insert(film);
        added
    }

    /// Returns true when the pair was present
    fn unlink(&mut self, film: FilmId, user: UserId) -> bool {
        let removed = match self.likes_by_film.get_mut(&film) {
            Some(users) => {
                let removed = users.remove(&user);
                if users.is_empty() {
                    self.likes_by_film.remove(&film);
                }
                removed
            }
            None => false,
        };

        if let Some(films) = self.likes_by_user.get_mut(&user) {
            films.remove(&film);
            if films.is_empty() {
                self.likes_by_user.remove(&user);
            }
        }

        removed
    }

    fn record_event(&mut self, user: UserId, operation: Operation, film: FilmId) {
        let event = UserEvent {
            event_id: self.feed.len() as i64 + 1,
            user_id: user,
            event_type: EventType::Like,
            operation,
            entity_id: film.0,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.feed.push(event);
    }
}

impl InMemoryStorage {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a seed, rejecting likes that reference unknown
    /// films or users
    pub fn from_seed(seed: Seed) -> AppResult<Self> {
        let mut inner = Inner::default();

        for genre in seed.genres {
            inner.genres.insert(genre.id, genre);
        }
        for director in seed.directors {
            inner.directors.insert(director.id, director);
        }
        for film in seed.films {
            inner.insert_film(film);
        }
        inner.users.extend(seed.users);

        for like in seed.likes {
            if !inner.films.contains_key(&like.film_id) {
                return Err(AppError::InvalidInput(format!(
                    "Seed like references unknown film {}",
                    like.film_id
                )));
            }
            if !inner.users.contains(&like.user_id) {
                return Err(AppError::InvalidInput(format!(
                    "Seed like references unknown user {}",
                    like.user_id
                )));
            }
            inner.link(like.film_id, like.user_id);
        }

        tracing::info!(
            films = inner.films.len(),
            users = inner.users.len(),
            likes = inner.likes_by_film.values().map(HashSet::len).sum::<usize>(),
            "Seeded in-memory storage"
        );

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    /// Reads a JSON seed file
    pub async fn load_seed(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Internal(format!("Failed to read seed {}: {}", path.display(), e))
        })?;
        let seed: Seed = serde_json::from_str(&raw)
            .map_err(|e| AppError::InvalidInput(format!("Malformed seed file: {}", e)))?;
        Self::from_seed(seed)
    }

}

#[async_trait]
impl LikesIndex for InMemoryStorage {
    async fn films_liked_by(&self, user: UserId) -> AppResult<HashSet<FilmId>> {
        let inner = self.inner.read().await;
        Ok(inner.likes_by_user.get(&user).cloned().unwrap_or_default())
    }

    async fn users_who_liked(&self, film: FilmId) -> AppResult<HashSet<UserId>> {
        let inner = self.inner.read().await;
        Ok(inner.likes_by_film.get(&film).cloned().unwrap_or_default())
    }

    async fn like_count(&self, film: FilmId) -> AppResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner.likes_by_film.get(&film).map_or(0, HashSet::len))
    }
}

#[async_trait]
impl FilmCatalog for InMemoryStorage {
    async fn all_films(&self) -> AppResult<Vec<FilmId>> {
        let inner = self.inner.read().await;
        Ok(inner.films.keys().copied().collect())
    }

    async fn genres_of(&self, film: FilmId) -> AppResult<HashSet<GenreId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .films
            .get(&film)
            .map(|f| f.genres.iter().map(|g| g.id).collect())
            .unwrap_or_default())
    }

    async fn release_year(&self, film: FilmId) -> AppResult<Option<i32>> {
        let inner = self.inner.read().await;
        Ok(inner.films.get(&film).map(Film::release_year))
    }

    async fn films(&self, ids: Vec<FilmId>) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.films.get(id))
            .cloned()
            .collect())
    }

    async fn films_by_director(&self, director: DirectorId) -> AppResult<Vec<FilmId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .films
            .values()
            .filter(|f| f.has_director(director))
            .map(|f| f.id)
            .collect())
    }

    async fn search_films(&self, query: &str, by: SearchBy) -> AppResult<Vec<FilmId>> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;

        Ok(inner
            .films
            .values()
            .filter(|f| {
                (by.title && f.name.to_lowercase().contains(&needle))
                    || (by.director
                        && f.directors
                            .iter()
                            .any(|d| d.name.to_lowercase().contains(&needle)))
            })
            .map(|f| f.id)
            .collect())
    }

    async fn film_exists(&self, film: FilmId) -> AppResult<bool> {
        Ok(self.inner.read().await.films.contains_key(&film))
    }

    async fn genre_exists(&self, genre: GenreId) -> AppResult<bool> {
        Ok(self.inner.read().await.genres.contains_key(&genre))
    }

    async fn director_exists(&self, director: DirectorId) -> AppResult<bool> {
        Ok(self.inner.read().await.directors.contains_key(&director))
    }
}

#[async_trait]
impl UserDirectory for InMemoryStorage {
    async fn user_exists(&self, user: UserId) -> AppResult<bool> {
        Ok(self.inner.read().await.users.contains(&user))
    }

    async fn feed(&self, user: UserId) -> AppResult<Vec<UserEvent>> {
        let inner = self.inner.read().await;
        Ok(inner
            .feed
            .iter()
            .filter(|e| e.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LikeLedger for InMemoryStorage {
    async fn add_like(&self, film: FilmId, user: UserId) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.link(film, user) {
            tracing::debug!(film_id = %film, user_id = %user, "Like already present");
        }
        inner.record_event(user, Operation::Add, film);
        Ok(())
    }

    async fn remove_like(&self, film: FilmId, user: UserId) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.unlink(film, user) {
            tracing::debug!(film_id = %film, user_id = %user, "No like to remove");
        }
        inner.record_event(user, Operation::Remove, film);
        Ok(())
    }
}

/// Test fixtures shared by the service tests
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn film(id: i64, year: i32, genres: &[i64], directors: &[(i64, &str)]) -> Film {
        Film {
            id: FilmId(id),
            name: format!("Film {}", id),
            description: None,
            release_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            duration: 100,
            genres: genres
                .iter()
                .map(|&g| Genre {
                    id: GenreId(g),
                    name: format!("Genre {}", g),
                })
                .collect(),
            directors: directors
                .iter()
                .map(|&(d, name)| Director {
                    id: DirectorId(d),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    /// Builds a store with the given films, users 1..=`users` and likes
    /// given as (user, film) pairs
    pub fn store(films: Vec<Film>, users: i64, likes: &[(i64, i64)]) -> InMemoryStorage {
        let seed = Seed {
            films,
            users: (1..=users).map(UserId).collect(),
            likes: likes
                .iter()
                .map(|&(user, film)| SeedLike {
                    user_id: UserId(user),
                    film_id: FilmId(film),
                })
                .collect(),
            ..Seed::default()
        };
        InMemoryStorage::from_seed(seed).unwrap()
    }
}
