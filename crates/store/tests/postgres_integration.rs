//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use sqlx::PgPool;
use store::{
    ArticleChanges, ArticleStore, NewArticle, NewUser, PostgresStore, StoreError, UserId,
    UserStore,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_users_and_articles.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let store = PostgresStore::connect(&info.connection_string, 5, Duration::from_secs(5))
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE articles, users RESTART IDENTITY")
        .execute(store.pool())
        .await
        .unwrap();

    store
}

async fn insert_user(store: &PostgresStore, username: &str) -> UserId {
    store
        .insert_user(NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            created_at: 1_700_000_000,
        })
        .await
        .unwrap()
        .user_id
}

fn new_article(title: &str, owner: UserId) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        content: format!("{title} body"),
        user_id: owner,
        created_at: 1_700_000_100,
    }
}

#[tokio::test]
#[serial]
async fn insert_and_find_user() {
    let store = get_test_store().await;
    let user_id = insert_user(&store, "alice").await;

    let found = store.find_user_by_username("alice").await.unwrap().unwrap();
    assert_eq!(found.user_id, user_id);
    assert_eq!(found.password_hash, "$argon2id$fake");
    assert!(store.find_user_by_username("ALICE").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_username_is_a_unique_violation() {
    let store = get_test_store().await;
    insert_user(&store, "alice").await;

    let err = store
        .insert_user(NewUser {
            username: "alice".to_string(),
            password_hash: "x".to_string(),
            created_at: 1,
        })
        .await
        .unwrap_err();

    match err {
        StoreError::UniqueViolation { constraint } => {
            assert_eq!(constraint, "users_username_key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
#[serial]
async fn article_round_trip() {
    let store = get_test_store().await;
    let owner = insert_user(&store, "alice").await;

    let created = store.insert_article(new_article("T", owner)).await.unwrap();
    let found = store.find_article(created.article_id).await.unwrap().unwrap();
    assert_eq!(found, created);
}

#[tokio::test]
#[serial]
async fn update_and_delete_enforce_owner_in_statement() {
    let store = get_test_store().await;
    let owner = insert_user(&store, "alice").await;
    let other = insert_user(&store, "bob").await;
    let created = store.insert_article(new_article("T", owner)).await.unwrap();
    let changes = ArticleChanges {
        title: "T2".to_string(),
        content: "C2".to_string(),
    };

    let affected = store
        .update_article(created.article_id, other, &changes)
        .await
        .unwrap();
    assert_eq!(affected, 0);
    assert_eq!(
        store.delete_article(created.article_id, other).await.unwrap(),
        0
    );

    let affected = store
        .update_article(created.article_id, owner, &changes)
        .await
        .unwrap();
    assert_eq!(affected, 1);
    let found = store.find_article(created.article_id).await.unwrap().unwrap();
    assert_eq!(found.title, "T2");
    assert_eq!(found.created_at, created.created_at);

    assert_eq!(
        store.delete_article(created.article_id, owner).await.unwrap(),
        1
    );
    assert!(store.find_article(created.article_id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn list_pages_in_key_order() {
    let store = get_test_store().await;
    let owner = insert_user(&store, "alice").await;
    let other = insert_user(&store, "bob").await;
    for i in 1..=25 {
        store
            .insert_article(new_article(&format!("a{i}"), owner))
            .await
            .unwrap();
        store
            .insert_article(new_article(&format!("b{i}"), other))
            .await
            .unwrap();
    }

    let page = store.list_articles(owner, 10, 10).await.unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page[0].title, "a11");
    assert_eq!(page[9].title, "a20");
    assert!(page.iter().all(|a| a.user_id == owner));

    let last = store.list_articles(owner, 20, 10).await.unwrap();
    assert_eq!(last.len(), 5);
}
