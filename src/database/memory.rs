use crate::database::user_repository::UserRepository;
use crate::error::{Error, Result};
use crate::models::user::{NewUser, UniqueColumn, User, UserQuery, UserStatus};
use crate::utils::time::now;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// `UserRepository` kept in process memory. Used for local runs and tests;
/// uniqueness is enforced the same way the database constraints do.
#[derive(Default)]
pub struct InMemoryUserRepository {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    rows: Vec<User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current row for `id` regardless of status.
    pub async fn snapshot(&self, id: i64) -> Option<User> {
        let state = self.state.read().await;
        state.rows.iter().find(|u| u.id == id).cloned()
    }
}

fn matches_status(user: &User, status: Option<UserStatus>) -> bool {
    status.map_or(true, |s| user.status == s)
}

fn column_value(user: &User, column: UniqueColumn) -> Option<&str> {
    match column {
        UniqueColumn::Username => Some(&user.username),
        UniqueColumn::Email => Some(&user.email),
        UniqueColumn::Phone => Some(&user.phone),
        UniqueColumn::PasswordResetToken => user.password_reset_token.as_deref(),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl MemoryState {
    fn check_unique(&self, candidate: &User) -> Result<()> {
        let columns = [
            UniqueColumn::Username,
            UniqueColumn::Email,
            UniqueColumn::Phone,
            UniqueColumn::PasswordResetToken,
        ];
        for column in columns {
            let Some(value) = column_value(candidate, column) else {
                continue;
            };
            let taken = self
                .rows
                .iter()
                .any(|u| u.id != candidate.id && column_value(u, column) == Some(value));
            if taken {
                return Err(Error::Duplicate(column));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: i64, status: Option<UserStatus>) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .iter()
            .find(|u| u.id == id && matches_status(u, status))
            .cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .iter()
            .find(|u| u.username == username && matches_status(u, status))
            .cloned())
    }

    async fn find_by_email(
        &self,
        email: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .iter()
            .find(|u| u.email == email && matches_status(u, status))
            .cloned())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        status: Option<UserStatus>,
    ) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .iter()
            .find(|u| u.password_reset_token.as_deref() == Some(token) && matches_status(u, status))
            .cloned())
    }

    async fn list(&self, query: UserQuery) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let search = query.search.filter(|s| !s.is_empty());
        Ok(state
            .rows
            .iter()
            .filter(|u| matches_status(u, query.status))
            .filter(|u| match &search {
                Some(s) => contains_ci(&u.name, s) || contains_ci(&u.surname, s),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn exists(
        &self,
        column: UniqueColumn,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .iter()
            .filter(|u| Some(u.id) != exclude_id)
            .any(|u| column_value(u, column) == Some(value)))
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        let timestamp = now();
        let created = User {
            id: state.next_id + 1,
            username: user.username,
            email: user.email,
            phone: user.phone,
            name: user.name,
            surname: user.surname,
            password_hash: user.password_hash,
            auth_key: user.auth_key,
            password_reset_token: user.password_reset_token,
            status: user.status,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.check_unique(&created)?;
        state.next_id = created.id;
        state.rows.push(created.clone());
        Ok(created)
    }

    async fn save(&self, user: &User) -> Result<User> {
        let mut state = self.state.write().await;
        let index = state
            .rows
            .iter()
            .position(|u| u.id == user.id)
            .ok_or_else(Error::not_found)?;
        state.check_unique(user)?;
        let row = &mut state.rows[index];
        let created_at = row.created_at;
        *row = User {
            created_at,
            updated_at: now(),
            ..user.clone()
        };
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, name: &str, surname: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            phone: format!("+7-{}", username),
            name: name.to_string(),
            surname: surname.to_string(),
            password_hash: "hash".to_string(),
            auth_key: "key".to_string(),
            password_reset_token: None,
            status: UserStatus::Active,
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let repo = InMemoryUserRepository::new();
        let a = repo.insert(new_user("alice", "Alice", "Smith")).await.unwrap();
        let b = repo.insert(new_user("bob", "Bob", "Jones")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_username() {
        let repo = InMemoryUserRepository::new();
        repo.insert(new_user("alice", "Alice", "Smith")).await.unwrap();
        let mut dup = new_user("alice", "Other", "Person");
        dup.email = "other@example.com".into();
        dup.phone = "+1".into();
        let err = repo.insert(dup).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate(UniqueColumn::Username)));
    }

    #[tokio::test]
    async fn list_filters_by_status_and_search() {
        let repo = InMemoryUserRepository::new();
        let alice = repo.insert(new_user("alice", "Alice", "Smith")).await.unwrap();
        repo.insert(new_user("bob", "Bob", "Smithers")).await.unwrap();
        repo.insert(new_user("carol", "Carol", "King")).await.unwrap();

        let mut deleted = alice.clone();
        deleted.status = UserStatus::Deleted;
        repo.save(&deleted).await.unwrap();

        let active = repo.list(UserQuery::active()).await.unwrap();
        assert_eq!(active.len(), 2);

        let smiths = repo
            .list(UserQuery::active().with_search("smith"))
            .await
            .unwrap();
        assert_eq!(smiths.len(), 1);
        assert_eq!(smiths[0].username, "bob");

        let everyone = repo.list(UserQuery::default()).await.unwrap();
        assert_eq!(everyone.len(), 3);
    }

    #[tokio::test]
    async fn exists_respects_exclusion() {
        let repo = InMemoryUserRepository::new();
        let alice = repo.insert(new_user("alice", "Alice", "Smith")).await.unwrap();
        assert!(repo
            .exists(UniqueColumn::Username, "alice", None)
            .await
            .unwrap());
        assert!(!repo
            .exists(UniqueColumn::Username, "alice", Some(alice.id))
            .await
            .unwrap());
        assert!(!repo
            .exists(UniqueColumn::PasswordResetToken, "anything", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn save_missing_row_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let mut ghost = repo.insert(new_user("ghost", "G", "H")).await.unwrap();
        ghost.id = 99;
        assert!(matches!(repo.save(&ghost).await, Err(Error::NotFound(_))));
    }
}
