use serde_json::{Map, Value as JsonValue};

use crate::dto::user_dto::{SignupPayload, UserResponse};
use crate::error::Result;
use crate::services::identity_store::IdentityStore;
use crate::services::signup_service::SignupService;

/// Request-facing user operations. Everything it returns is already in
/// its safe external form.
#[derive(Clone)]
pub struct UserService {
    identity: IdentityStore,
    signup: SignupService,
}

impl UserService {
    pub fn new(identity: IdentityStore) -> Self {
        let signup = SignupService::new(identity.clone());
        Self { identity, signup }
    }

    pub async fn list_users(&self) -> Result<Vec<UserResponse>> {
        let users = self.identity.list_active().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn search(&self, query: &str) -> Result<Vec<UserResponse>> {
        let users = self.identity.search_active(query).await?;
        tracing::debug!(query_len = query.len(), hits = users.len(), "user search");
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn update_user(&self, id: i64, field_values: &Map<String, JsonValue>) -> Result<()> {
        self.identity.update(id, field_values).await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.identity.soft_delete(id).await?;
        Ok(())
    }

    pub async fn create_user(&self, payload: SignupPayload) -> Result<UserResponse> {
        let user = self.signup.signup(payload).await?;
        Ok(UserResponse::from(user))
    }
}
