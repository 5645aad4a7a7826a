pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod store;

use store::SqlxUserRepository;
use transactional_outbox::SqlxOutboxRepository;

pub type AppUserService = domain::UserService<SqlxUserRepository, SqlxOutboxRepository>;
