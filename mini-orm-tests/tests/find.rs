#![allow(clippy::expect_used)]

mod common;

use common::{TestDatabase, date_time};
use mini_orm::{EntityManager, Error};
use mini_orm_tests::User;

async fn seed(engine: &EntityManager) -> Vec<User> {
    let registered = date_time(2024, 5, 1, 12, 0, 0);

    let mut users = vec![
        User::new("alice", 31, registered),
        User::new("bob", 17, registered),
        User::new("carol", 45, registered),
    ];

    for user in &mut users {
        assert!(engine.persist(user).await.expect("persist failed"));
    }

    users
}

#[tokio::test]
async fn test_find_by_missing_id() {
    let db = TestDatabase::new();
    let engine = db.engine();
    seed(&engine).await;

    let err = engine
        .find_by_id::<User>(999)
        .await
        .expect_err("no such user");

    assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn test_find_on_empty_table() {
    let db = TestDatabase::new();
    db.create_table::<User>().await;
    let engine = db.engine();

    assert!(
        engine
            .find_all::<User>()
            .await
            .expect("query failed")
            .is_empty()
    );

    let err = engine
        .find_first::<User>()
        .await
        .expect_err("table is empty");
    assert!(matches!(err, Error::NotFound { ref table, .. } if table == "Users"), "{err}");
}

#[tokio::test]
async fn test_find_all_returns_every_row() {
    let db = TestDatabase::new();
    let engine = db.engine();
    let seeded = seed(&engine).await;

    let all = engine.find_all::<User>().await.expect("query failed");

    assert_eq!(all, seeded);
}

#[tokio::test]
async fn test_find_all_where_passes_filter_through() {
    let db = TestDatabase::new();
    let engine = db.engine();
    seed(&engine).await;

    let adults = engine
        .find_all_where::<User>("WHERE [Age] >= 18 ORDER BY [Age] DESC")
        .await
        .expect("query failed");

    assert_eq!(
        adults.iter().map(|e| e.username.as_str()).collect::<Vec<_>>(),
        vec!["carol", "alice"]
    );
}

#[tokio::test]
async fn test_find_all_where_without_match() {
    let db = TestDatabase::new();
    let engine = db.engine();
    seed(&engine).await;

    let nobody = engine
        .find_all_where::<User>("WHERE [Username] = 'mallory'")
        .await
        .expect("query failed");

    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_find_first_where() {
    let db = TestDatabase::new();
    let engine = db.engine();
    seed(&engine).await;

    let youngest = engine
        .find_first_where::<User>("ORDER BY [Age] ASC")
        .await
        .expect("query failed");
    assert_eq!(youngest.username, "bob");

    let bob = engine
        .find_first_where::<User>("WHERE [Username] = 'bob'")
        .await
        .expect("query failed");
    assert_eq!(bob.age, 17);

    let err = engine
        .find_first_where::<User>("WHERE [Age] > 100")
        .await
        .expect_err("nobody is that old");
    assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn test_invalid_filter_surfaces_database_error() {
    let db = TestDatabase::new();
    let engine = db.engine();
    seed(&engine).await;

    let err = engine
        .find_all_where::<User>("WHERE [NoSuchColumn] = 1")
        .await
        .expect_err("filter references an unknown column");

    assert!(matches!(err, Error::Database(_)), "{err}");
}

#[tokio::test]
async fn test_find_on_missing_table_surfaces_database_error() {
    let db = TestDatabase::new();
    let engine = db.engine();

    let err = engine
        .find_all::<User>()
        .await
        .expect_err("table does not exist");

    assert!(matches!(err, Error::Database(_)), "{err}");
}

#[tokio::test]
async fn test_find_first_where_with_own_limit() {
    let db = TestDatabase::new();
    let engine = db.engine();
    seed(&engine).await;

    let oldest = engine
        .find_first_where::<User>("ORDER BY [Age] DESC LIMIT 2")
        .await
        .expect("query failed");
    assert_eq!(oldest.username, "carol");

    let second_youngest = engine
        .find_first_where::<User>("ORDER BY [Age] ASC LIMIT 1 OFFSET 1")
        .await
        .expect("query failed");
    assert_eq!(second_youngest.username, "alice");
}
