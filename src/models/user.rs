use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::Type)]
#[repr(i16)]
pub enum UserStatus {
    Deleted = 0,
    #[default]
    Active = 10,
}

impl UserStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(UserStatus::Deleted),
            10 => Some(UserStatus::Active),
            _ => None,
        }
    }
}

/// A stored user account. Not `Serialize`; external output goes through `UserResponse`.
#[derive(Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub name: String,
    pub surname: String,
    pub password_hash: String,
    pub auth_key: String,
    pub password_reset_token: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Attributes of a user that has not been persisted yet.
#[derive(Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub name: String,
    pub surname: String,
    pub password_hash: String,
    pub auth_key: String,
    pub password_reset_token: Option<String>,
    pub status: UserStatus,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Filter for listing users. Status is always explicit; `None` means any status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub status: Option<UserStatus>,
    /// Substring matched against `name` OR `surname`. Empty or `None` skips the filter.
    pub search: Option<String>,
}

impl UserQuery {
    pub fn active() -> Self {
        Self {
            status: Some(UserStatus::Active),
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.is_empty() { None } else { Some(search) };
        self
    }
}

/// Columns with a table-wide uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueColumn {
    Username,
    Email,
    Phone,
    PasswordResetToken,
}

impl UniqueColumn {
    pub fn column(self) -> &'static str {
        match self {
            UniqueColumn::Username => "username",
            UniqueColumn::Email => "email",
            UniqueColumn::Phone => "phone",
            UniqueColumn::PasswordResetToken => "password_reset_token",
        }
    }

    /// Column guarded by a `users_<column>_key` constraint.
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "users_username_key" => Some(UniqueColumn::Username),
            "users_email_key" => Some(UniqueColumn::Email),
            "users_phone_key" => Some(UniqueColumn::Phone),
            "users_password_reset_token_key" => Some(UniqueColumn::PasswordResetToken),
            _ => None,
        }
    }
}
