//! Domain types shared by the database layer and the HTTP handlers.

pub mod chart;
pub mod mods;
pub mod replay;
pub mod stats;

pub use chart::ChartType;
pub use mods::Mod;
pub use replay::ReplayData;
pub use stats::HitStats;
