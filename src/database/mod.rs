pub mod memory;
pub mod pool;
pub mod user_repository;
