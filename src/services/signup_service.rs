use validator::Validate;

use crate::dto::user_dto::SignupPayload;
use crate::error::Result;
use crate::models::user::{NewUser, User, UserStatus};
use crate::services::identity_store::IdentityStore;
use crate::utils::token::generate_random_key;

#[derive(Clone)]
pub struct SignupService {
    identity: IdentityStore,
}

impl SignupService {
    pub fn new(identity: IdentityStore) -> Self {
        Self { identity }
    }

    /// Registers a new active user. Payload and entity errors are reported together.
    pub async fn signup(&self, payload: SignupPayload) -> Result<User> {
        let errors = payload.validate().err().unwrap_or_default();

        let user = NewUser {
            username: payload.username,
            email: payload.email,
            phone: payload.phone,
            name: payload.name,
            surname: payload.surname,
            password_hash: self.identity.hash_password(&payload.password)?,
            auth_key: generate_random_key(),
            password_reset_token: None,
            status: UserStatus::Active,
        };

        let created = self.identity.create(user, errors).await?;
        tracing::info!(user_id = created.id, "signup completed");
        Ok(created)
    }
}
