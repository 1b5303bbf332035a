pub mod existence;
pub mod likes;
pub mod popularity;
pub mod recommendations;

pub use popularity::{PopularityRanker, DEFAULT_TOP_COUNT};
pub use recommendations::Recommender;
