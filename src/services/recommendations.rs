use std::collections::{BTreeSet, HashMap};

use crate::{
    error::AppResult,
    models::{FilmId, UserId},
    storage::LikesIndex,
};

/// Collaborative "people who like what you like" recommender
///
/// Neighbours are the other users sharing the largest number of liked films
/// with the target user. Every neighbour tied at that maximum contributes,
/// and the user's own likes are never recommended back.
pub struct Recommender<'a, L: ?Sized> {
    likes: &'a L,
}

impl<'a, L> Recommender<'a, L>
where
    L: LikesIndex + ?Sized,
{
    pub fn new(likes: &'a L) -> Self {
        Self { likes }
    }

    /// Films liked by the user's closest neighbours that the user has not
    /// liked yet, in ascending id order
    ///
    /// A user with no likes, or whose likes nobody else shares, gets an
    /// empty set.
    pub async fn recommendations_for(&self, user: UserId) -> AppResult<BTreeSet<FilmId>> {
        let my_likes = self.likes.films_liked_by(user).await?;
        if my_likes.is_empty() {
            tracing::debug!(user_id = %user, "No likes, nothing to recommend");
            return Ok(BTreeSet::new());
        }

        // Each time a candidate shows up under one of my films it shares one more like
        let mut overlap: HashMap<UserId, usize> = HashMap::new();
        for film in &my_likes {
            for other in self.likes.users_who_liked(*film).await? {
                if other != user {
                    *overlap.entry(other).or_insert(0) += 1;
                }
            }
        }

        let Some(&max_overlap) = overlap.values().max() else {
            tracing::debug!(user_id = %user, "No users share a liked film");
            return Ok(BTreeSet::new());
        };

        let mut neighbours: Vec<UserId> = overlap
            .into_iter()
            .filter(|&(_, shared)| shared == max_overlap)
            .map(|(other, _)| other)
            .collect();
        neighbours.sort();

        let mut recommendations = BTreeSet::new();
        for neighbour in &neighbours {
            let theirs = self.likes.films_liked_by(*neighbour).await?;
            recommendations.extend(theirs.difference(&my_likes).copied());
        }

        tracing::debug!(
            user_id = %user,
            neighbours = neighbours.len(),
            max_overlap,
            recommended = recommendations.len(),
            "Computed recommendations"
        );

        Ok(recommendations)
    }
}
