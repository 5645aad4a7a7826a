//! Second outbox producer (spec §3/§6), proving the outbox/relay libraries are
//! service-agnostic rather than bid-specific. Mirrors `bidding_service::domain::bid_service`'s
//! shape: begin -> business mutation -> encode event -> save to outbox -> commit.

use crate::error::IdentityError;
use crate::store::{User, UserRepository};
use db_pool::TransactionManager;
use event_schema::{UserCreated, EVENT_TYPE_USER_CREATED};
use std::sync::Arc;
use transactional_outbox::OutboxRepository;
use uuid::Uuid;

const SOURCE: &str = "identity-service";

pub struct UserService<UR: UserRepository, OR: OutboxRepository> {
    txm: TransactionManager,
    users: Arc<UR>,
    outbox: Arc<OR>,
}

impl<UR: UserRepository, OR: OutboxRepository> UserService<UR, OR> {
    pub fn new(txm: TransactionManager, users: Arc<UR>, outbox: Arc<OR>) -> Self {
        Self { txm, users, outbox }
    }

    pub async fn create_user(
        &self,
        email: &str,
        full_name: &str,
        country_code: &str,
    ) -> Result<User, IdentityError> {
        validate_email(email)?;

        let mut tx = self.txm.begin().await?;

        let user = self.users.create_user(&mut tx, email, full_name, country_code).await?;

        let body = UserCreated {
            user_id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            country_code: user.country_code.clone(),
            created_at: user.created_at,
        };

        let payload = event_schema::encode(Uuid::new_v4(), SOURCE, body)
            .map_err(|e| IdentityError::TransactionFailed(e.to_string()))?;
        let event = event_schema::OutboxEvent::new(EVENT_TYPE_USER_CREATED, payload);
        self.outbox.save_event(&mut tx, &event).await?;

        tx.commit()
            .await
            .map_err(|e| IdentityError::TransactionFailed(e.to_string()))?;

        Ok(user)
    }
}

fn validate_email(email: &str) -> Result<(), IdentityError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(IdentityError::InvalidEmail);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_email_without_at_sign() {
        assert!(matches!(validate_email("not-an-email"), Err(IdentityError::InvalidEmail)));
    }

    #[test]
    fn rejects_blank_email() {
        assert!(matches!(validate_email("  "), Err(IdentityError::InvalidEmail)));
    }

    #[test]
    fn accepts_a_well_formed_email() {
        assert!(validate_email("alice@example.com").is_ok());
    }
}
