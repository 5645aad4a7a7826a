mod user_stats_repo;

pub use user_stats_repo::{SqlxUserStatsRepository, UserStats, UserStatsRepository};
