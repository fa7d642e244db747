use std::borrow::Cow;

use validator::{ValidateEmail, ValidationError, ValidationErrors};

use crate::database::user_repository::UserRepository;
use crate::error::Result;
use crate::models::user::{NewUser, UniqueColumn, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    Length { min: Option<usize>, max: usize },
    Email,
    Unique(UniqueColumn),
}

#[derive(Debug)]
pub struct FieldRules {
    pub field: &'static str,
    pub label: &'static str,
    pub rules: &'static [Rule],
}

/// Rules are evaluated top to bottom and every failure is collected.
/// An empty value only reports `Required`; the remaining rules skip it.
pub const USER_RULES: &[FieldRules] = &[
    FieldRules {
        field: "username",
        label: "Username",
        rules: &[
            Rule::Required,
            Rule::Length { min: Some(2), max: 255 },
            Rule::Unique(UniqueColumn::Username),
        ],
    },
    FieldRules {
        field: "auth_key",
        label: "Auth Key",
        rules: &[Rule::Required],
    },
    FieldRules {
        field: "password_hash",
        label: "Password Hash",
        rules: &[Rule::Required],
    },
    FieldRules {
        field: "email",
        label: "Email",
        rules: &[
            Rule::Required,
            Rule::Length { min: None, max: 255 },
            Rule::Unique(UniqueColumn::Email),
            Rule::Email,
        ],
    },
    FieldRules {
        field: "phone",
        label: "Phone",
        rules: &[
            Rule::Required,
            Rule::Length { min: None, max: 255 },
            Rule::Unique(UniqueColumn::Phone),
        ],
    },
    FieldRules {
        field: "name",
        label: "Name",
        rules: &[Rule::Required, Rule::Length { min: None, max: 50 }],
    },
    FieldRules {
        field: "surname",
        label: "Surname",
        rules: &[Rule::Required, Rule::Length { min: None, max: 50 }],
    },
    FieldRules {
        field: "password_reset_token",
        label: "Password Reset Token",
        rules: &[Rule::Unique(UniqueColumn::PasswordResetToken)],
    },
];

/// Read access to the validated attributes of a user, persisted or not.
pub trait UserFields {
    /// Row id to exclude from uniqueness checks.
    fn row_id(&self) -> Option<i64>;
    fn field(&self, name: &str) -> Option<&str>;
}

impl UserFields for User {
    fn row_id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "username" => Some(&self.username),
            "email" => Some(&self.email),
            "phone" => Some(&self.phone),
            "name" => Some(&self.name),
            "surname" => Some(&self.surname),
            "password_hash" => Some(&self.password_hash),
            "auth_key" => Some(&self.auth_key),
            "password_reset_token" => self.password_reset_token.as_deref(),
            _ => None,
        }
    }
}

impl UserFields for NewUser {
    fn row_id(&self) -> Option<i64> {
        None
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "username" => Some(&self.username),
            "email" => Some(&self.email),
            "phone" => Some(&self.phone),
            "name" => Some(&self.name),
            "surname" => Some(&self.surname),
            "password_hash" => Some(&self.password_hash),
            "auth_key" => Some(&self.auth_key),
            "password_reset_token" => self.password_reset_token.as_deref(),
            _ => None,
        }
    }
}

pub fn field_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

fn taken_error(label: &str, value: &str) -> ValidationError {
    field_error(
        "unique",
        format!("{} \"{}\" has already been taken.", label, value),
    )
}

/// The field error reported when `value` already exists in `column`.
pub fn unique_error(column: UniqueColumn, value: &str) -> ValidationError {
    let label = USER_RULES
        .iter()
        .find(|rules| rules.field == column.column())
        .map_or(column.column(), |rules| rules.label);
    taken_error(label, value)
}

/// Checks a single value against the rules that do not need storage.
pub fn check_static(rule: Rule, label: &str, value: &str) -> Option<ValidationError> {
    match rule {
        Rule::Required | Rule::Unique(_) => None,
        Rule::Length { min, max } => {
            let len = value.chars().count();
            match min {
                Some(min) if len < min => Some(field_error(
                    "length",
                    format!("{} should contain at least {} characters.", label, min),
                )),
                _ if len > max => Some(field_error(
                    "length",
                    format!("{} should contain at most {} characters.", label, max),
                )),
                _ => None,
            }
        }
        Rule::Email => {
            if value.validate_email() {
                None
            } else {
                Some(field_error(
                    "email",
                    format!("{} is not a valid email address.", label),
                ))
            }
        }
    }
}

/// Runs `USER_RULES` against `subject`, adding every failure to `errors`.
/// Storage errors abort; rule failures never do.
pub async fn validate_user<T>(
    subject: &T,
    repo: &dyn UserRepository,
    errors: &mut ValidationErrors,
) -> Result<()>
where
    T: UserFields + Sync + ?Sized,
{
    for field_rules in USER_RULES {
        let value = subject.field(field_rules.field).unwrap_or("");
        if value.is_empty() {
            if field_rules.rules.contains(&Rule::Required) {
                errors.add(
                    field_rules.field,
                    field_error("required", format!("{} cannot be blank.", field_rules.label)),
                );
            }
            continue;
        }

        for rule in field_rules.rules {
            if let Rule::Unique(column) = *rule {
                if repo.exists(column, value, subject.row_id()).await? {
                    errors.add(field_rules.field, taken_error(field_rules.label, value));
                }
            } else if let Some(error) = check_static(*rule, field_rules.label, value) {
                errors.add(field_rules.field, error);
            }
        }
    }
    Ok(())
}
