use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use shortlink_core::{Link, Sweeper, Token};
use shortlink_storage::{LinkRepository, PostgresLinkStore, ReverseLookup, StorageError};
use shortlink_test_infra::{PostgresConfig, PostgresServer};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresLinkStore,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::default())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let pool = connect_with_retry(&url).await;

        let repo = PostgresLinkStore::new(pool);
        repo.ensure_schema().await.expect("create schema");

        Self {
            _postgres: postgres,
            repo,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::PgPool {
    let mut last_error = None;

    for _ in 0..20 {
        match PgPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn link(token: &str, url: &str, expires_at: Timestamp) -> Link {
    Link {
        original_link: url.to_string(),
        token: Token::new(token),
        expires_at,
    }
}

fn in_an_hour() -> Timestamp {
    Timestamp::now() + SignedDuration::from_hours(1)
}

fn a_second_ago() -> Timestamp {
    Timestamp::now() - SignedDuration::from_secs(1)
}

#[tokio::test]
async fn insert_and_get_live_link() {
    let fixture = Fixture::start().await;
    let stored = link("abc123", "https://example.com", in_an_hour());

    fixture.repo.store(&stored).await.unwrap();

    let got = fixture
        .repo
        .get_by_token(&Token::new("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.original_link, "https://example.com");
    assert_eq!(
        got.expires_at.as_millisecond(),
        stored.expires_at.as_millisecond()
    );

    match fixture
        .repo
        .get_by_original("https://example.com")
        .await
        .unwrap()
    {
        ReverseLookup::Found(found) => assert_eq!(found.token, Token::new("abc123")),
        other => panic!("expected Found, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_token_and_url_are_missing() {
    let fixture = Fixture::start().await;

    assert!(fixture
        .repo
        .get_by_token(&Token::new("nope"))
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        fixture.repo.get_by_original("https://nope.example").await.unwrap(),
        ReverseLookup::Missing
    );
}

#[tokio::test]
async fn insert_conflicts_with_live_token() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .store(&link("abc123", "https://one.example", in_an_hour()))
        .await
        .unwrap();

    let err = fixture
        .repo
        .store(&link("abc123", "https://two.example", in_an_hour()))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn expired_rows_are_invisible_and_replaceable() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .store(&link("expired", "https://old.example", a_second_ago()))
        .await
        .unwrap();

    assert!(fixture
        .repo
        .get_by_token(&Token::new("expired"))
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        fixture.repo.get_by_original("https://old.example").await.unwrap(),
        ReverseLookup::Missing
    );

    fixture
        .repo
        .store(&link("expired", "https://new.example", in_an_hour()))
        .await
        .unwrap();

    let got = fixture
        .repo
        .get_by_token(&Token::new("expired"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.original_link, "https://new.example");
}

#[tokio::test]
async fn sweep_deletes_and_returns_expired_tokens() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .store(&link("old", "https://old.example", a_second_ago()))
        .await
        .unwrap();
    fixture
        .repo
        .store(&link("new", "https://new.example", in_an_hour()))
        .await
        .unwrap();

    let removed = fixture.repo.sweep_expired(Timestamp::now()).await.unwrap();
    assert_eq!(removed, vec![Token::new("old")]);

    let again = fixture.repo.sweep_expired(Timestamp::now()).await.unwrap();
    assert!(again.is_empty());

    assert!(fixture
        .repo
        .get_by_token(&Token::new("new"))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn expiry_loop_publishes_swept_tokens() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .store(&link("old", "https://old.example", a_second_ago()))
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::channel(4);
    let expiry = fixture
        .repo
        .start_expiry_loop(Duration::from_millis(200), tx)
        .unwrap();

    let batch = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("sweep within timeout")
        .expect("sink open");
    assert_eq!(batch, vec![Token::new("old")]);

    expiry.stop().await;
}

#[tokio::test]
async fn rejected_interval_leaves_expiry_loop_startable() {
    let fixture = Fixture::start().await;
    let (tx, _rx) = mpsc::channel(1);

    let err = fixture
        .repo
        .start_expiry_loop(Duration::ZERO, tx.clone())
        .unwrap_err();
    assert!(matches!(err, StorageError::Operation(_)));

    let expiry = fixture
        .repo
        .start_expiry_loop(Duration::from_secs(60), tx)
        .unwrap();
    expiry.stop().await;
}
