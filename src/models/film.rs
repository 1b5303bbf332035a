use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{DirectorId, FilmId, GenreId};

/// Film genre (comedy, drama, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// Film director
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Director {
    pub id: DirectorId,
    pub name: String,
}

/// Represents a film returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: FilmId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub release_date: NaiveDate,
    /// Duration in minutes
    pub duration: u32,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub directors: Vec<Director>,
}

impl Film {
    /// Year the film was released
    pub fn release_year(&self) -> i32 {
        self.release_date.year()
    }

    pub fn has_director(&self, director: DirectorId) -> bool {
        self.directors.iter().any(|d| d.id == director)
    }
}
