use std::cmp::Reverse;

use crate::{
    error::{AppError, AppResult},
    models::{DirectorId, DirectorSort, Film, FilmId, GenreId, SearchBy, UserId},
    storage::{FilmCatalog, LikesIndex},
};

/// Result size used when a search has nothing to search for
pub const DEFAULT_TOP_COUNT: i64 = 10;

/// Ranks films by how many users liked them
///
/// Every ordering produced here is total: like count descending, then film
/// id ascending, so repeated calls over the same likes return the same list.
pub struct PopularityRanker<'a, L: ?Sized, C: ?Sized> {
    likes: &'a L,
    catalog: &'a C,
}

impl<'a, L, C> PopularityRanker<'a, L, C>
where
    L: LikesIndex + ?Sized,
    C: FilmCatalog + ?Sized,
{
    pub fn new(likes: &'a L, catalog: &'a C) -> Self {
        Self { likes, catalog }
    }

    /// Most liked films, optionally restricted to a genre and/or release year
    ///
    /// Returns at most `limit` films; fewer when fewer match. A `limit` of
    /// zero or below is rejected.
    pub async fn top_films(
        &self,
        limit: i64,
        genre: Option<GenreId>,
        year: Option<i32>,
    ) -> AppResult<Vec<FilmId>> {
        if limit <= 0 {
            return Err(AppError::InvalidInput(format!(
                "count must be positive, got {}",
                limit
            )));
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let candidates = self.catalog.films_matching(genre, year).await?;
        let mut ranked = self.rank_by_likes(candidates).await?;
        ranked.truncate(limit);

        tracing::debug!(
            limit,
            genre = ?genre,
            year = ?year,
            returned = ranked.len(),
            "Ranked popular films"
        );

        Ok(ranked)
    }

    /// Films liked by both users, most liked first
    pub async fn common_films(&self, user: UserId, friend: UserId) -> AppResult<Vec<FilmId>> {
        let mine = self.likes.films_liked_by(user).await?;
        let theirs = self.likes.films_liked_by(friend).await?;

        let shared: Vec<FilmId> = mine.intersection(&theirs).copied().collect();
        self.rank_by_likes(shared).await
    }

    /// A director's films, oldest first or most liked first
    pub async fn director_films(
        &self,
        director: DirectorId,
        sort: DirectorSort,
    ) -> AppResult<Vec<Film>> {
        let ids = self.catalog.films_by_director(director).await?;

        match sort {
            DirectorSort::Likes => {
                let ranked = self.rank_by_likes(ids).await?;
                self.catalog.films(ranked).await
            }
            DirectorSort::Year => {
                let mut films = self.catalog.films(ids).await?;
                films.sort_by_key(|f| (f.release_date, f.id));
                Ok(films)
            }
        }
    }

    /// Films whose title and/or director name contains `query`, most liked
    /// first. A blank query or empty criteria fall back to the overall top.
    pub async fn search(&self, query: &str, by: SearchBy) -> AppResult<Vec<FilmId>> {
        let query = query.trim();
        if query.is_empty() || by.is_empty() {
            return self.top_films(DEFAULT_TOP_COUNT, None, None).await;
        }

        let found = self.catalog.search_films(query, by).await?;
        self.rank_by_likes(found).await
    }

    async fn rank_by_likes(&self, mut films: Vec<FilmId>) -> AppResult<Vec<FilmId>> {
        if films.is_empty() {
            return Ok(films);
        }

        let counts = self.likes.like_counts(&films).await?;
        films.sort_by_key(|film| (Reverse(counts.get(film).copied().unwrap_or(0)), *film));
        Ok(films)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::fixtures::{film, store};
    use crate::storage::{InMemoryStorage, MockFilmCatalog, MockLikesIndex};
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    async fn top(
        storage: &InMemoryStorage,
        limit: i64,
        genre: Option<i64>,
        year: Option<i32>,
    ) -> AppResult<Vec<FilmId>> {
        PopularityRanker::new(storage, storage)
            .top_films(limit, genre.map(GenreId), year)
            .await
    }

    fn ids(raw: &[i64]) -> Vec<FilmId> {
        raw.iter().copied().map(FilmId).collect()
    }

    fn film_ids(films: &[Film]) -> Vec<FilmId> {
        films.iter().map(|f| f.id).collect()
    }

    #[tokio::test]
    async fn test_top_films_breaks_ties_by_id() {
        // F1 liked by U1, U2; F2 by U1, U3; F3 by U2
        let storage = store(
            vec![film(1, 2000, &[], &[]), film(2, 2000, &[], &[]), film(3, 2000, &[], &[])],
            3,
            &[(1, 1), (2, 1), (1, 2), (3, 2), (2, 3)],
        );

        assert_eq!(top(&storage, 2, None, None).await.unwrap(), ids(&[1, 2]));
    }

    #[tokio::test]
    async fn test_top_films_orders_by_like_count() {
        let storage = store(
            vec![film(1, 2000, &[], &[]), film(2, 2000, &[], &[]), film(3, 2000, &[], &[])],
            3,
            &[(1, 3), (2, 3), (3, 3), (1, 2)],
        );

        assert_eq!(
            top(&storage, 10, None, None).await.unwrap(),
            ids(&[3, 2, 1])
        );
    }

    #[tokio::test]
    async fn test_top_films_applies_genre_and_year_filters() {
        let storage = store(
            vec![
                film(1, 1999, &[1], &[]),
                film(2, 1999, &[2], &[]),
                film(3, 2000, &[1], &[]),
                film(4, 1999, &[1, 2], &[]),
            ],
            2,
            &[(1, 3), (2, 3), (1, 4)],
        );

        assert_eq!(
            top(&storage, 5, Some(1), Some(1999)).await.unwrap(),
            ids(&[4, 1])
        );
        assert_eq!(top(&storage, 5, Some(2), None).await.unwrap(), ids(&[4, 2]));
        assert_eq!(top(&storage, 5, None, Some(2000)).await.unwrap(), ids(&[3]));
    }

    #[tokio::test]
    async fn test_top_films_is_capped_by_limit() {
        let films = (1..=8).map(|id| film(id, 2000, &[], &[])).collect();
        let storage = store(films, 0, &[]);

        for limit in 1..=10 {
            let result = top(&storage, limit, None, None).await.unwrap();
            assert!(result.len() as i64 <= limit);
        }
        assert_eq!(top(&storage, 3, None, None).await.unwrap(), ids(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn test_top_films_rejects_non_positive_limit() {
        let storage = store(vec![film(1, 2000, &[], &[])], 0, &[]);

        assert!(matches!(
            top(&storage, 0, None, None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert_err!(top(&storage, -3, None, None).await);
    }

    #[tokio::test]
    async fn test_top_films_empty_catalog_and_unknown_genre() {
        let empty = InMemoryStorage::new();
        assert!(top(&empty, 10, None, None).await.unwrap().is_empty());

        let storage = store(vec![film(1, 2000, &[1], &[])], 0, &[]);
        assert!(top(&storage, 10, Some(42), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_films_is_stable_across_calls() {
        let storage = store(
            (1..=6).map(|id| film(id, 2000, &[], &[])).collect(),
            3,
            &[(1, 5), (2, 5), (1, 2), (3, 4)],
        );

        let first = assert_ok!(top(&storage, 6, None, None).await);
        let second = assert_ok!(top(&storage, 6, None, None).await);
        assert_eq!(first, second);
        assert_eq!(first, ids(&[5, 2, 4, 1, 3, 6]));
    }

    #[tokio::test]
    async fn test_common_films() {
        let storage = store(
            vec![film(1, 2000, &[], &[]), film(2, 2000, &[], &[]), film(3, 2000, &[], &[])],
            3,
            &[(1, 1), (1, 2), (1, 3), (2, 2), (2, 3), (3, 3)],
        );
        let ranker = PopularityRanker::new(&storage, &storage);

        assert_eq!(
            ranker.common_films(UserId(1), UserId(2)).await.unwrap(),
            ids(&[3, 2])
        );
        assert!(ranker
            .common_films(UserId(1), UserId(9))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_director_films_sorting() {
        let storage = store(
            vec![
                film(1, 2010, &[], &[(7, "Nolan")]),
                film(2, 2000, &[], &[(7, "Nolan")]),
                film(3, 2005, &[], &[(8, "Other")]),
            ],
            2,
            &[(1, 1), (2, 1)],
        );
        let ranker = PopularityRanker::new(&storage, &storage);

        let by_year = ranker
            .director_films(DirectorId(7), DirectorSort::Year)
            .await
            .unwrap();
        assert_eq!(film_ids(&by_year), ids(&[2, 1]));
        assert_eq!(by_year[0].release_year(), 2000);

        let by_likes = ranker
            .director_films(DirectorId(7), DirectorSort::Likes)
            .await
            .unwrap();
        assert_eq!(film_ids(&by_likes), ids(&[1, 2]));
    }

    #[tokio::test]
    async fn test_search_ranks_matches_and_falls_back_to_top() {
        let mut crew = film(1, 2000, &[], &[]);
        crew.name = "The Crew".to_string();
        let mut screw = film(2, 2001, &[], &[]);
        screw.name = "Screwball".to_string();
        let other = film(3, 2002, &[], &[]);
        let storage = store(vec![crew, screw, other], 2, &[(1, 2), (2, 3), (1, 3)]);
        let ranker = PopularityRanker::new(&storage, &storage);

        let by_title = SearchBy {
            title: true,
            director: false,
        };
        assert_eq!(ranker.search("crew", by_title).await.unwrap(), ids(&[2, 1]));
        assert_eq!(
            ranker.search("  ", by_title).await.unwrap(),
            ids(&[3, 2, 1])
        );
        assert_eq!(
            ranker.search("crew", SearchBy::default()).await.unwrap(),
            ids(&[3, 2, 1])
        );
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let likes = MockLikesIndex::new();
        let mut catalog = MockFilmCatalog::new();
        catalog
            .expect_films_matching()
            .returning(|_, _| Err(AppError::Internal("catalog offline".into())));

        let result = PopularityRanker::new(&likes, &catalog)
            .top_films(5, None, None)
            .await;

        assert!(matches!(result, Err(AppError::Internal(msg)) if msg == "catalog offline"));
    }

    #[tokio::test]
    async fn test_ranking_uses_one_bulk_lookup_each() {
        let mut likes = MockLikesIndex::new();
        likes
            .expect_like_counts()
            .times(1)
            .returning(|films| Ok(films.iter().map(|&f| (f, f.0 as usize % 2)).collect()));
        likes.expect_like_count().never();

        let mut catalog = MockFilmCatalog::new();
        catalog
            .expect_films_matching()
            .with(eq(Some(GenreId(3))), eq(None))
            .times(1)
            .returning(|_, _| Ok(vec![FilmId(1), FilmId(2), FilmId(3)]));
        catalog.expect_all_films().never();
        catalog.expect_genres_of().never();
        catalog.expect_release_year().never();

        let result = PopularityRanker::new(&likes, &catalog)
            .top_films(5, Some(GenreId(3)), None)
            .await
            .unwrap();

        assert_eq!(result, ids(&[1, 3, 2]));
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_like_lookup() {
        let mut likes = MockLikesIndex::new();
        likes.expect_like_counts().never();

        let mut catalog = MockFilmCatalog::new();
        catalog.expect_films_matching().returning(|_, _| Ok(Vec::new()));

        let result = PopularityRanker::new(&likes, &catalog)
            .top_films(5, None, Some(2001))
            .await
            .unwrap();

        assert!(result.is_empty());
    }
}
