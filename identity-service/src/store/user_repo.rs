//! `users` table access (spec.md §3/§6, identity-service's own aggregate).

use crate::error::{map_create_user_error, IdentityError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db_pool::Tx;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub country_code: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(
        &self,
        tx: &mut Tx,
        email: &str,
        full_name: &str,
        country_code: &str,
    ) -> Result<User, IdentityError>;
}

pub struct SqlxUserRepository;

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_user(
        &self,
        tx: &mut Tx,
        email: &str,
        full_name: &str,
        country_code: &str,
    ) -> Result<User, IdentityError> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            country_code: country_code.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, country_code, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.country_code)
        .bind(user.created_at)
        .execute(&mut **tx)
        .await
        .map_err(map_create_user_error)?;

        Ok(user)
    }
}
