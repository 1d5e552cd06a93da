pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod query;

pub use config::EngineConfig;
pub use engine::EntityManager;
pub use entity::Entity;
pub use error::{Error, Result};

/// Derive macro to implement [`Entity`](entity::Entity).
pub use mini_orm_macros::Entity;

pub use chrono;
pub use mini_orm_sqlparse::schema::{SqlColumn, SqlTable};
pub use sqlx;
