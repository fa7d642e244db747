use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use validator::ValidationErrors;

use crate::database::user_repository::UserRepository;
use crate::error::{Error, Result};
use crate::models::user::{NewUser, User, UserQuery, UserStatus};
use crate::services::user_rules::{field_error, unique_error, validate_user, UserFields};
use crate::utils::crypto::{constant_time_eq, CredentialHasher};
use crate::utils::time::Clock;
use crate::utils::token::{generate_random_key, generate_reset_token, reset_token_timestamp};

/// Owns the rules and credential operations of the `User` entity.
#[derive(Clone)]
pub struct IdentityStore {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
    reset_token_expire: i64,
}

impl IdentityStore {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
        reset_token_expire: i64,
    ) -> Self {
        Self {
            repo,
            hasher,
            clock,
            reset_token_expire,
        }
    }

    pub async fn find_active_by_id(&self, id: i64) -> Result<Option<User>> {
        self.repo.find_by_id(id, Some(UserStatus::Active)).await
    }

    pub async fn find_active_by_username(&self, username: &str) -> Result<Option<User>> {
        self.repo
            .find_by_username(username, Some(UserStatus::Active))
            .await
    }

    /// Expired or malformed tokens never reach storage.
    pub async fn find_active_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        if !self.is_reset_token_valid(token) {
            return Ok(None);
        }
        self.repo
            .find_by_reset_token(token, Some(UserStatus::Active))
            .await
    }

    /// Stateless token identities are not part of this model; use the
    /// session-based lookups instead.
    pub async fn find_identity_by_access_token(&self, _token: &str) -> Result<User> {
        Err(Error::Unsupported(
            "find_identity_by_access_token is not implemented".to_string(),
        ))
    }

    pub fn is_reset_token_valid(&self, token: &str) -> bool {
        match reset_token_timestamp(token) {
            Some(issued_at) => {
                issued_at.saturating_add(self.reset_token_expire) >= self.clock.unix_timestamp()
            }
            None => false,
        }
    }

    pub fn set_password(&self, user: &mut User, plaintext: &str) -> Result<()> {
        user.password_hash = self.hash_password(plaintext)?;
        Ok(())
    }

    pub fn hash_password(&self, plaintext: &str) -> Result<String> {
        self.hasher
            .hash(plaintext)
            .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, user: &User, plaintext: &str) -> bool {
        match self.hasher.verify(plaintext, &user.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "stored password hash is malformed");
                false
            }
        }
    }

    pub fn generate_auth_key(&self, user: &mut User) {
        user.auth_key = generate_random_key();
    }

    pub fn validate_auth_key(&self, user: &User, candidate: &str) -> bool {
        constant_time_eq(&user.auth_key, candidate)
    }

    pub fn generate_password_reset_token(&self, user: &mut User) {
        user.password_reset_token = Some(generate_reset_token(self.clock.unix_timestamp()));
    }

    pub fn clear_password_reset_token(&self, user: &mut User) {
        user.password_reset_token = None;
    }

    pub async fn validate(&self, user: &User) -> Result<()> {
        let mut errors = ValidationErrors::new();
        validate_user(user, self.repo.as_ref(), &mut errors).await?;
        into_result(errors)
    }

    pub async fn list_active(&self) -> Result<Vec<User>> {
        self.repo.list(UserQuery::active()).await
    }

    pub async fn search_active(&self, query: &str) -> Result<Vec<User>> {
        self.repo.list(UserQuery::active().with_search(query)).await
    }

    /// Inserts a new user after trimming and validating it.
    pub async fn create(&self, mut user: NewUser, mut errors: ValidationErrors) -> Result<User> {
        user.username = user.username.trim().to_string();
        validate_user(&user, self.repo.as_ref(), &mut errors).await?;
        into_result(errors)?;

        let created = self
            .repo
            .insert(user.clone())
            .await
            .map_err(|e| duplicate_as_validation(e, &user))?;
        tracing::info!(user_id = created.id, "user created");
        Ok(created)
    }

    /// Writes `field_values` onto the active user `id`, revalidates and
    /// persists. Unknown keys are ignored.
    pub async fn update(&self, id: i64, field_values: &Map<String, JsonValue>) -> Result<User> {
        let mut user = self.find_active_by_id(id).await?.ok_or_else(Error::not_found)?;

        let mut errors = ValidationErrors::new();
        apply_fields(&mut user, field_values, &mut errors);
        user.username = user.username.trim().to_string();
        validate_user(&user, self.repo.as_ref(), &mut errors).await?;
        into_result(errors)?;

        let saved = self
            .repo
            .save(&user)
            .await
            .map_err(|e| duplicate_as_validation(e, &user))?;
        tracing::info!(user_id = saved.id, "user updated");
        Ok(saved)
    }

    pub async fn soft_delete(&self, id: i64) -> Result<User> {
        let mut user = self.find_active_by_id(id).await?.ok_or_else(Error::not_found)?;
        user.status = UserStatus::Deleted;
        let saved = self.repo.save(&user).await?;
        tracing::info!(user_id = saved.id, "user soft-deleted");
        Ok(saved)
    }

    /// Active user with this username whose password verifies.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_active_by_username(username).await? else {
            return Ok(None);
        };
        if self.verify_password(&user, password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Issues a reset token for the active user with `email`, reusing a
    /// token that is still valid.
    pub async fn request_password_reset(&self, email: &str) -> Result<User> {
        let mut user = self
            .repo
            .find_by_email(email, Some(UserStatus::Active))
            .await?
            .ok_or_else(Error::not_found)?;

        let still_valid = user
            .password_reset_token
            .as_deref()
            .is_some_and(|token| self.is_reset_token_valid(token));
        if still_valid {
            return Ok(user);
        }

        self.generate_password_reset_token(&mut user);
        let saved = self.repo.save(&user).await?;
        tracing::info!(user_id = saved.id, "password reset token issued");
        Ok(saved)
    }

    /// Sets a new password for the owner of a valid token and burns the token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User> {
        let Some(mut user) = self.find_active_by_reset_token(token).await? else {
            let mut errors = ValidationErrors::new();
            errors.add(
                "token",
                field_error("invalid", "Wrong password reset token.".to_string()),
            );
            return Err(Error::Validation(errors));
        };

        self.set_password(&mut user, new_password)?;
        self.clear_password_reset_token(&mut user);
        let saved = self.repo.save(&user).await?;
        tracing::info!(user_id = saved.id, "password reset");
        Ok(saved)
    }
}

fn into_result(errors: ValidationErrors) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

/// A uniqueness race lost after validation is reported like a failed `unique` rule.
fn duplicate_as_validation<T: UserFields + ?Sized>(err: Error, subject: &T) -> Error {
    match err {
        Error::Duplicate(column) => {
            let value = subject.field(column.column()).unwrap_or_default();
            let mut errors = ValidationErrors::new();
            errors.add(column.column(), unique_error(column, value));
            Error::Validation(errors)
        }
        other => other,
    }
}

/// Text value of a JSON scalar; numbers are accepted for text columns.
fn text_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Null => Some(String::new()),
        _ => None,
    }
}

fn status_value(value: &JsonValue) -> Option<UserStatus> {
    let code = match value {
        JsonValue::Number(n) => n.as_i64()?,
        JsonValue::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    UserStatus::from_code(code)
}

/// Mass-assigns the entity's assignable attributes from an untyped map.
fn apply_fields(user: &mut User, values: &Map<String, JsonValue>, errors: &mut ValidationErrors) {
    for (key, value) in values {
        let (field, slot): (&'static str, &mut String) = match key.as_str() {
            "username" => ("username", &mut user.username),
            "email" => ("email", &mut user.email),
            "phone" => ("phone", &mut user.phone),
            "name" => ("name", &mut user.name),
            "surname" => ("surname", &mut user.surname),
            "password_hash" => ("password_hash", &mut user.password_hash),
            "auth_key" => ("auth_key", &mut user.auth_key),
            "password_reset_token" => {
                match value {
                    JsonValue::Null => user.password_reset_token = None,
                    other => match text_value(other) {
                        Some(text) if text.is_empty() => user.password_reset_token = None,
                        Some(text) => user.password_reset_token = Some(text),
                        None => errors.add(
                            "password_reset_token",
                            field_error(
                                "string",
                                "Password Reset Token must be a string.".to_string(),
                            ),
                        ),
                    },
                }
                continue;
            }
            "status" => {
                match status_value(value) {
                    Some(status) => user.status = status,
                    None => errors.add(
                        "status",
                        field_error("in", "Status is invalid.".to_string()),
                    ),
                }
                continue;
            }
            _ => continue,
        };

        match text_value(value) {
            Some(text) => *slot = text,
            None => errors.add(
                field,
                field_error("string", format!("{} must be a string.", field)),
            ),
        }
    }
}
