#![allow(dead_code, clippy::expect_used)]

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use mini_orm::{
    Entity, EngineConfig, EntityManager,
    query,
    sqlx::{Connection, SqliteConnection},
};
use tempfile::TempDir;

/// A fresh database file in its own temporary directory.
pub struct TestDatabase {
    dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temporary directory"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("test.db")
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::for_database_file(self.path())
    }

    pub fn engine(&self) -> EntityManager {
        EntityManager::with_config(self.config())
    }

    pub fn engine_without_auto_create(&self) -> EntityManager {
        let mut config = self.config();
        config.auto_create_tables = false;

        EntityManager::with_config(config)
    }

    /// Run raw statements against the database, outside of the engine.
    pub async fn execute(&self, sql: &str) {
        let options = self.config().connect_options().expect("valid config");
        let mut connection = SqliteConnection::connect_with(&options)
            .await
            .expect("failed to connect");

        mini_orm::sqlx::raw_sql(sql)
            .execute(&mut connection)
            .await
            .expect("failed to execute statement");

        connection.close().await.expect("failed to close");
    }

    /// Create the table of `T` without inserting anything.
    pub async fn create_table<T: Entity>(&self) {
        let metadata = T::metadata().expect("entity should resolve");
        self.execute(&query::create_table(&metadata)).await;
    }
}

pub fn date_time(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|e| e.and_hms_opt(h, min, s))
        .expect("valid date")
}
