use std::str::FromStr;

use crate::error::AppError;

/// Ordering applied to a director's filmography
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorSort {
    /// Oldest release first
    Year,
    /// Most liked first
    Likes,
}

impl FromStr for DirectorSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "year" => Ok(DirectorSort::Year),
            "likes" => Ok(DirectorSort::Likes),
            _ => Err(AppError::InvalidInput(format!("Unknown sort type: {:?}", s))),
        }
    }
}

/// Fields a film search matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchBy {
    pub title: bool,
    pub director: bool,
}

impl SearchBy {
    pub fn is_empty(&self) -> bool {
        !self.title && !self.director
    }
}

impl FromStr for SearchBy {
    type Err = AppError;

    /// Parses a comma separated list such as `title,director`.
    /// Blank input yields an empty selection.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut by = SearchBy::default();

        for criterion in s.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            match criterion.to_lowercase().as_str() {
                "title" => by.title = true,
                "director" => by.director = true,
                other => {
                    return Err(AppError::InvalidInput(format!(
                        "Unknown search criterion: {}",
                        other
                    )))
                }
            }
        }

        Ok(by)
    }
}
