pub mod identity_store;
pub mod signup_service;
pub mod user_rules;
pub mod user_service;
