use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::user::User;

/// The only serialized form of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub name: String,
    pub surname: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            name: user.name,
            surname: user.surname,
        }
    }
}

/// Missing fields deserialize as empty strings and are reported as blank.
#[derive(Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct SignupPayload {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub name: String,
    pub surname: String,
    #[validate(length(min = 6, message = "Password should contain at least 6 characters."))]
    pub password: String,
}

impl std::fmt::Debug for SignupPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupPayload")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}
