pub mod connection;
pub mod models;
pub mod query;
pub mod replay_storage;

pub use connection::Database;
pub use models::{
    Chart, HistoryRow, LeaderboardRow, Level, LevelListRow, NewRecord, PublicUser, Record,
    RecordDetail, User,
};
