pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::database::user_repository::{PgUserRepository, UserRepository};
use crate::services::{identity_store::IdentityStore, user_service::UserService};
use crate::utils::{crypto::Argon2Hasher, time::SystemClock};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        Self::from_repository(
            Arc::new(PgUserRepository::new(pool)),
            config.password_reset_token_expire,
        )
    }

    /// Wires the services over any repository with the production hasher and clock.
    pub fn from_repository(repo: Arc<dyn UserRepository>, reset_token_expire: i64) -> Self {
        let identity = IdentityStore::new(
            repo,
            Arc::new(Argon2Hasher),
            Arc::new(SystemClock),
            reset_token_expire,
        );
        Self {
            user_service: UserService::new(identity),
        }
    }
}
