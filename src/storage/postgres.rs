use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::collections::{HashMap, HashSet};

use crate::{
    error::{AppError, AppResult},
    models::{
        Director, DirectorId, EventType, Film, FilmId, Genre, GenreId, Operation, SearchBy,
        UserEvent, UserId,
    },
};

use super::{FilmCatalog, LikeLedger, LikesIndex, UserDirectory};

/// Postgres backend
///
/// Expects the Filmorate schema: `films`, `genres`, `film_genres`,
/// `directors`, `film_directors`, `users`, `likes` (unique on
/// `(user_id, film_id)`) and `user_event` (`created_at` defaulting to now).
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

#[derive(FromRow)]
struct FilmRow {
    film_id: i64,
    name: String,
    description: Option<String>,
    release_date: NaiveDate,
    duration: i32,
}

#[derive(FromRow)]
struct FeedRow {
    event_id: i64,
    user_id: i64,
    event_type: String,
    operation: String,
    entity_id: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<FeedRow> for UserEvent {
    type Error = AppError;

    fn try_from(row: FeedRow) -> Result<Self, Self::Error> {
        let event_type = match row.event_type.as_str() {
            "LIKE" => EventType::Like,
            other => return Err(AppError::Internal(format!("Unknown event type {}", other))),
        };
        let operation = match row.operation.as_str() {
            "ADD" => Operation::Add,
            "REMOVE" => Operation::Remove,
            other => return Err(AppError::Internal(format!("Unknown operation {}", other))),
        };

        Ok(UserEvent {
            event_id: row.event_id,
            user_id: UserId(row.user_id),
            event_type,
            operation,
            entity_id: row.entity_id,
            timestamp: row.created_at.timestamp_millis(),
        })
    }
}

/// Escapes LIKE wildcards and wraps the lowercased query in `%`
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    async fn record_like_event(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user: UserId,
        operation: Operation,
        film: FilmId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_event (user_id, event_type, operation, entity_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.0)
        .bind(EventType::Like.as_str())
        .bind(operation.as_str())
        .bind(film.0)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn exists(&self, sql: &str, id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl LikesIndex for PgStorage {
    async fn films_liked_by(&self, user: UserId) -> AppResult<HashSet<FilmId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT film_id FROM likes WHERE user_id = $1")
            .bind(user.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(FilmId).collect())
    }

    async fn users_who_liked(&self, film: FilmId) -> AppResult<HashSet<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT user_id FROM likes WHERE film_id = $1")
            .bind(film.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn like_count(&self, film: FilmId) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE film_id = $1")
            .bind(film.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn like_counts(&self, films: &[FilmId]) -> AppResult<HashMap<FilmId, usize>> {
        let raw_ids: Vec<i64> = films.iter().map(|id| id.0).collect();
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT film_id, COUNT(*)
            FROM likes
            WHERE film_id = ANY($1)
            GROUP BY film_id
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut counts: HashMap<FilmId, usize> = films.iter().map(|&id| (id, 0)).collect();
        for (film_id, count) in rows {
            counts.insert(FilmId(film_id), count as usize);
        }
        Ok(counts)
    }
}

#[async_trait]
impl FilmCatalog for PgStorage {
    async fn all_films(&self) -> AppResult<Vec<FilmId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT film_id FROM films ORDER BY film_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(FilmId).collect())
    }

    async fn films_matching(
        &self,
        genre: Option<GenreId>,
        year: Option<i32>,
    ) -> AppResult<Vec<FilmId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT f.film_id
            FROM films f
            WHERE ($1::BIGINT IS NULL OR EXISTS (
                    SELECT 1
                    FROM film_genres fg
                    WHERE fg.film_id = f.film_id AND fg.genre_id = $1
                ))
              AND ($2::INT IS NULL OR EXTRACT(YEAR FROM f.release_date)::INT = $2)
            ORDER BY f.film_id
            "#,
        )
        .bind(genre.map(|g| g.0))
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(FilmId).collect())
    }

    async fn genres_of(&self, film: FilmId) -> AppResult<HashSet<GenreId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT genre_id FROM film_genres WHERE film_id = $1")
                .bind(film.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(GenreId).collect())
    }

    async fn release_year(&self, film: FilmId) -> AppResult<Option<i32>> {
        let date: Option<NaiveDate> =
            sqlx::query_scalar("SELECT release_date FROM films WHERE film_id = $1")
                .bind(film.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(date.map(|d| d.year()))
    }

    async fn films(&self, ids: Vec<FilmId>) -> AppResult<Vec<Film>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw_ids: Vec<i64> = ids.iter().map(|id| id.0).collect();

        let rows = sqlx::query_as::<_, FilmRow>(
            r#"
            SELECT film_id, name, description, release_date, duration
            FROM films
            WHERE film_id = ANY($1)
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&self.pool)
        .await?;

        let genre_rows: Vec<(i64, i64, String)> = sqlx::query_as(
            r#"
            SELECT fg.film_id, g.genre_id, g.name
            FROM film_genres fg
            JOIN genres g ON fg.genre_id = g.genre_id
            WHERE fg.film_id = ANY($1)
            ORDER BY g.genre_id
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&self.pool)
        .await?;

        let director_rows: Vec<(i64, i64, String)> = sqlx::query_as(
            r#"
            SELECT fd.film_id, d.director_id, d.name
            FROM film_directors fd
            JOIN directors d ON fd.director_id = d.director_id
            WHERE fd.film_id = ANY($1)
            ORDER BY d.director_id
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut films: HashMap<FilmId, Film> = HashMap::with_capacity(rows.len());
        for row in rows {
            let duration = u32::try_from(row.duration).map_err(|_| {
                AppError::Internal(format!("Negative duration for film {}", row.film_id))
            })?;
            films.insert(
                FilmId(row.film_id),
                Film {
                    id: FilmId(row.film_id),
                    name: row.name,
                    description: row.description,
                    release_date: row.release_date,
                    duration,
                    genres: Vec::new(),
                    directors: Vec::new(),
                },
            );
        }

        for (film_id, genre_id, name) in genre_rows {
            if let Some(film) = films.get_mut(&FilmId(film_id)) {
                film.genres.push(Genre {
                    id: GenreId(genre_id),
                    name,
                });
            }
        }

        for (film_id, director_id, name) in director_rows {
            if let Some(film) = films.get_mut(&FilmId(film_id)) {
                film.directors.push(Director {
                    id: DirectorId(director_id),
                    name,
                });
            }
        }

        Ok(ids.iter().filter_map(|id| films.remove(id)).collect())
    }

    async fn films_by_director(&self, director: DirectorId) -> AppResult<Vec<FilmId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT film_id FROM film_directors WHERE director_id = $1 ORDER BY film_id",
        )
        .bind(director.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(FilmId).collect())
    }

    async fn search_films(&self, query: &str, by: SearchBy) -> AppResult<Vec<FilmId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT f.film_id
            FROM films f
            WHERE ($2 AND LOWER(f.name) LIKE $1)
               OR ($3 AND EXISTS (
                    SELECT 1
                    FROM film_directors fd
                    JOIN directors d ON fd.director_id = d.director_id
                    WHERE fd.film_id = f.film_id AND LOWER(d.name) LIKE $1
               ))
            ORDER BY f.film_id
            "#,
        )
        .bind(like_pattern(query))
        .bind(by.title)
        .bind(by.director)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(FilmId).collect())
    }

    async fn film_exists(&self, film: FilmId) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM films WHERE film_id = $1)", film.0)
            .await
    }

    async fn genre_exists(&self, genre: GenreId) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM genres WHERE genre_id = $1)", genre.0)
            .await
    }

    async fn director_exists(&self, director: DirectorId) -> AppResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM directors WHERE director_id = $1)",
            director.0,
        )
        .await
    }
}

#[async_trait]
impl UserDirectory for PgStorage {
    async fn user_exists(&self, user: UserId) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)", user.0)
            .await
    }

    async fn feed(&self, user: UserId) -> AppResult<Vec<UserEvent>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            r#"
            SELECT event_id, user_id, event_type, operation, entity_id, created_at
            FROM user_event
            WHERE user_id = $1
            ORDER BY event_id
            "#,
        )
        .bind(user.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserEvent::try_from).collect()
    }
}

#[async_trait]
impl LikeLedger for PgStorage {
    async fn add_like(&self, film: FilmId, user: UserId) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO likes (user_id, film_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, film_id) DO NOTHING
            "#,
        )
        .bind(user.0)
        .bind(film.0)
        .execute(&mut *tx)
        .await?;

        Self::record_like_event(&mut tx, user, Operation::Add, film).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_like(&self, film: FilmId, user: UserId) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND film_id = $2")
            .bind(user.0)
            .bind(film.0)
            .execute(&mut *tx)
            .await?;

        Self::record_like_event(&mut tx, user, Operation::Remove, film).await?;

        tx.commit().await?;
        Ok(())
    }
}
