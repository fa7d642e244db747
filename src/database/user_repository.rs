use crate::error::Result;
use crate::models::user::{NewUser, UniqueColumn, User, UserQuery, UserStatus};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

const USER_COLUMNS: &str = "id, username, email, phone, name, surname, password_hash, auth_key, password_reset_token, status, created_at, updated_at";

/// Storage capabilities the identity store needs. Status filters are passed
/// explicitly; `None` matches every status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64, status: Option<UserStatus>) -> Result<Option<User>>;

    async fn find_by_username(
        &self,
        username: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str, status: Option<UserStatus>)
        -> Result<Option<User>>;

    async fn find_by_reset_token(
        &self,
        token: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>>;

    async fn list(&self, query: UserQuery) -> Result<Vec<User>>;

    /// Whether any row other than `exclude_id` holds `value` in `column`.
    async fn exists(
        &self,
        column: UniqueColumn,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool>;

    async fn insert(&self, user: NewUser) -> Result<User>;

    /// Overwrites every mutable column of the row with `user.id`.
    async fn save(&self, user: &User) -> Result<User>;
}

/// Escapes `%`, `_` and `\` so user input matches literally inside LIKE.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one_by(
        &self,
        column: &'static str,
        value: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE ", USER_COLUMNS));
        qb.push(column).push(" = ").push_bind(value.to_string());
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" LIMIT 1");

        let user = qb
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64, status: Option<UserStatus>) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND ($2::SMALLINT IS NULL OR status = $2)",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_username(
        &self,
        username: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>> {
        self.find_one_by("username", username, status).await
    }

    async fn find_by_email(
        &self,
        email: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>> {
        self.find_one_by("email", email, status).await
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>> {
        self.find_one_by("password_reset_token", token, status).await
    }

    async fn list(&self, query: UserQuery) -> Result<Vec<User>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));
        if let Some(status) = query.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search));
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR surname ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY id");

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn exists(
        &self,
        column: UniqueColumn,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT EXISTS (SELECT 1 FROM users WHERE ");
        qb.push(column.column()).push(" = ").push_bind(value.to_string());
        if let Some(id) = exclude_id {
            qb.push(" AND id <> ").push_bind(id);
        }
        qb.push(")");

        let (exists,) = qb
            .build_query_as::<(bool,)>()
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (
                username, email, phone, name, surname,
                password_hash, auth_key, password_reset_token, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.phone)
        .bind(user.name)
        .bind(user.surname)
        .bind(user.password_hash)
        .bind(user.auth_key)
        .bind(user.password_reset_token)
        .bind(user.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn save(&self, user: &User) -> Result<User> {
        let saved = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET
                username = $2,
                email = $3,
                phone = $4,
                name = $5,
                surname = $6,
                password_hash = $7,
                auth_key = $8,
                password_reset_token = $9,
                status = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.password_hash)
        .bind(&user.auth_key)
        .bind(&user.password_reset_token)
        .bind(user.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }
}
