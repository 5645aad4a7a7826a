pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod store;

use store::SqlxUserStatsRepository;

pub type AppConsumer = domain::Consumer<SqlxUserStatsRepository>;
