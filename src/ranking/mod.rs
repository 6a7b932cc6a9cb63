//! Leaderboard ranking and rating aggregation.
//!
//! Everything in here is pure arithmetic over values loaded by
//! [`crate::database::query`]; the handlers glue the two together.
//!
//! - [`grade`]: letter grades from scores
//! - [`rating`]: record and player performance rating
//! - [`bayesian`]: weighted level quality rating
//! - [`progression`]: exp and player level
//! - [`leaderboard`]: paging and rank-around windows
//! - [`profile`]: per-player aggregates

pub mod bayesian;
pub mod grade;
pub mod leaderboard;
pub mod profile;
pub mod progression;
pub mod rating;

pub use bayesian::{Prior, RatingSummary};
pub use grade::Grade;
pub use leaderboard::{Page, Paged, RankWindow};
