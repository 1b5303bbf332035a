use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod feed;
pub mod film;
pub mod query;

pub use feed::{EventType, Operation, UserEvent};
pub use film::{Director, Film, Genre};
pub use query::{DirectorSort, SearchBy};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a registered user
    UserId
);
entity_id!(
    /// Identifier of a film in the catalog
    FilmId
);
entity_id!(
    /// Identifier of a genre
    GenreId
);
entity_id!(
    /// Identifier of a director
    DirectorId
);
