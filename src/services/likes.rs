use crate::{
    error::AppResult,
    models::{FilmId, UserId},
    storage::{FilmCatalog, LikeLedger, UserDirectory},
};

use super::existence::{ensure_film, ensure_user};

/// Records that `user` likes `film`
///
/// Both ids must exist. Liking the same film twice leaves a single like but
/// still appends a feed event.
pub async fn add_like<S>(storage: &S, film: FilmId, user: UserId) -> AppResult<()>
where
    S: FilmCatalog + UserDirectory + LikeLedger + ?Sized,
{
    ensure_film(storage, film).await?;
    ensure_user(storage, user).await?;

    storage.add_like(film, user).await?;
    tracing::info!(film_id = %film, user_id = %user, "Like added");
    Ok(())
}

/// Withdraws a like. Removing a like that was never given is not an error.
pub async fn remove_like<S>(storage: &S, film: FilmId, user: UserId) -> AppResult<()>
where
    S: FilmCatalog + UserDirectory + LikeLedger + ?Sized,
{
    ensure_film(storage, film).await?;
    ensure_user(storage, user).await?;

    storage.remove_like(film, user).await?;
    tracing::info!(film_id = %film, user_id = %user, "Like removed");
    Ok(())
}
