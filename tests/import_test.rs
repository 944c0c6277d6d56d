use certmailer::db;
use certmailer::import::{self, ImportError};
use certmailer::keygen::KeyGenerator;
use certmailer::model::RecipientRow;
use certmailer::roster;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::io::Cursor;

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = db::init_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

fn keygen() -> KeyGenerator<StdRng> {
    KeyGenerator::with_rng(StdRng::seed_from_u64(7), 8)
}

fn row(name: &str, addr: &str) -> RecipientRow {
    RecipientRow {
        name: name.into(),
        contact_address: addr.into(),
    }
}

async fn batch_count(pool: &sqlx::SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM batches")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn participant_count(pool: &sqlx::SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn import_creates_one_batch_and_n_participants() {
    let pool = setup_pool().await;
    let rows = vec![
        row("Alice", "alice@example.com"),
        row("Bob", "bob@example.com"),
        row("Carol", "carol@example.com"),
    ];

    let outcome = import::import_batch(&pool, &rows, &mut keygen())
        .await
        .unwrap();
    assert_eq!(outcome.imported, 3);
    assert_eq!(batch_count(&pool).await, 1);

    let participants = db::list_participants(&pool, &outcome.batch_id)
        .await
        .unwrap();
    assert_eq!(participants.len(), 3);
    assert_eq!(participants[0].name, "Alice");
    assert_eq!(participants[2].name, "Carol");
    for p in &participants {
        assert_eq!(p.batch_id, outcome.batch_id);
        assert_eq!(p.access_key.len(), 8);
        assert!(p
            .access_key
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }
}

#[tokio::test]
async fn empty_roster_is_rejected() {
    let pool = setup_pool().await;
    let err = import::import_batch(&pool, &[], &mut keygen())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::EmptyInput));
    assert_eq!(batch_count(&pool).await, 0);
}

#[tokio::test]
async fn invalid_row_rolls_back_everything() {
    let pool = setup_pool().await;
    let rows = vec![
        row("Alice", "alice@example.com"),
        row("Bob", "bob@example.com"),
        row("", "nameless@example.com"),
        row("Dave", "dave@example.com"),
        row("Erin", "erin@example.com"),
    ];

    let err = import::import_batch(&pool, &rows, &mut keygen())
        .await
        .unwrap_err();
    match err {
        ImportError::Validation(msg) => assert!(msg.contains("row 3")),
        other => panic!("wrong error: {other}"),
    }

    // All-or-nothing: neither the batch nor any participant survived.
    assert_eq!(batch_count(&pool).await, 0);
    assert_eq!(participant_count(&pool).await, 0);
}

#[tokio::test]
async fn missing_contact_rolls_back_everything() {
    let pool = setup_pool().await;
    let rows = vec![row("Alice", "alice@example.com"), row("Bob", "")];

    let err = import::import_batch(&pool, &rows, &mut keygen())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Validation(_)));
    assert_eq!(participant_count(&pool).await, 0);
}

#[tokio::test]
async fn keys_are_unique_within_a_batch() {
    let pool = setup_pool().await;
    let rows: Vec<RecipientRow> = (0..50)
        .map(|i| row(&format!("Person {i}"), &format!("p{i}@example.com")))
        .collect();

    let outcome = import::import_batch(&pool, &rows, &mut keygen())
        .await
        .unwrap();
    let participants = db::list_participants(&pool, &outcome.batch_id)
        .await
        .unwrap();
    let keys: HashSet<&str> = participants.iter().map(|p| p.access_key.as_str()).collect();
    assert_eq!(keys.len(), 50);
}

#[tokio::test]
async fn keys_are_unique_across_batches() {
    let pool = setup_pool().await;
    let rows: Vec<RecipientRow> = (0..10)
        .map(|i| row(&format!("Person {i}"), &format!("p{i}@example.com")))
        .collect();

    // Same seed both times: the second import draws the same candidate
    // stream, finds each candidate taken, and must keep drawing.
    let first = import::import_batch(&pool, &rows, &mut keygen())
        .await
        .unwrap();
    let second = import::import_batch(&pool, &rows, &mut keygen())
        .await
        .unwrap();

    let mut keys = HashSet::new();
    for batch_id in [&first.batch_id, &second.batch_id] {
        for p in db::list_participants(&pool, batch_id).await.unwrap() {
            assert!(keys.insert(p.access_key), "duplicate key across batches");
        }
    }
    assert_eq!(keys.len(), 20);
}

#[tokio::test]
async fn issued_keys_round_trip_on_later_listing() {
    let pool = setup_pool().await;
    let rows = vec![row("Alice", "alice@example.com"), row("Bob", "bob@example.com")];
    let outcome = import::import_batch(&pool, &rows, &mut keygen())
        .await
        .unwrap();

    let first: Vec<String> = db::list_participants(&pool, &outcome.batch_id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.access_key)
        .collect();
    let second: Vec<String> = db::list_participants(&pool, &outcome.batch_id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.access_key)
        .collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn csv_roster_feeds_import() {
    let pool = setup_pool().await;
    let csv = "name,contact_address\nAlice,alice@example.com\nBob,bob@example.com\n";
    let rows = roster::read_recipients(Cursor::new(csv)).unwrap();

    let outcome = import::import_batch(&pool, &rows, &mut keygen())
        .await
        .unwrap();
    assert_eq!(outcome.imported, 2);

    let participants = db::list_participants(&pool, &outcome.batch_id)
        .await
        .unwrap();
    assert_eq!(participants[0].contact_address, "alice@example.com");
    assert_eq!(participants[1].contact_address, "bob@example.com");
}
