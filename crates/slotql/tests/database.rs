use slotql::qb::{self, BindMap, Fields, raw};
use slotql::{Database, DatabaseConfig, FromRow, QbError, QbResult, RowExt, RunResult};
use std::time::Duration;

async fn try_connect() -> Option<tokio_postgres::Client> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

async fn create_users(client: &tokio_postgres::Client) {
    client
        .batch_execute(
            "CREATE TEMP TABLE users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                score INT NOT NULL DEFAULT 0,
                created_at TIMESTAMP,
                updated_at TIMESTAMP
            )",
        )
        .await
        .unwrap();
}

#[derive(Debug)]
struct User {
    id: i64,
    username: String,
    score: i32,
}

impl FromRow for User {
    fn from_row(row: &tokio_postgres::Row) -> QbResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            username: row.try_get_column("username")?,
            score: row.try_get_column("score")?,
        })
    }
}

#[tokio::test]
async fn insert_select_update_delete() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    create_users(&client).await;
    let db = Database::new(&client);

    let alice = db
        .run(
            &qb::insert_with_timestamps(
                "users",
                Fields::new().set("username", "alice").set("email", "a@x").set("score", 3),
            )
            .unwrap(),
        )
        .await
        .unwrap();
    let Some(alice_id) = alice.insert_id() else {
        panic!("expected an insert id, got {alice:?}");
    };
    db.run(&qb::insert("users", Fields::new().set("username", "bob").set("score", 7)).unwrap())
        .await
        .unwrap();

    let users: Vec<User> = db
        .find_all_as(&qb::select("*").from("users").order("id"))
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].id, alice_id);
    assert_eq!(users[1].username, "bob");

    let stamped: Option<chrono::NaiveDateTime> = db
        .find_one(
            &qb::select("created_at")
                .from("users")
                .filter(Fields::new().set("id", alice_id))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(stamped.is_some());

    let updated = db
        .run(
            &qb::update_with_timestamps(
                "users",
                Fields::new().set("score", raw("score + 1")),
                Fields::new().cmp("score", ">", 5),
            )
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(updated, RunResult::RowsAffected(1));

    let bob: Option<User> = db
        .find_row_as(
            &qb::select("*")
                .from("users")
                .filter(Fields::new().set("username", "bob"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bob.map(|u| u.score), Some(8));

    let deleted = db
        .run(&qb::delete("users", Fields::new().set("username", "bob"), None).unwrap())
        .await
        .unwrap();
    assert_eq!(deleted.rows_affected(), Some(1));
}

#[tokio::test]
async fn count_col_and_assoc() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    create_users(&client).await;
    let db = Database::new(&client);

    let batch = qb::insert_multi("users", ["username", "score"])
        .rows((0..5).map(|i| vec![slotql::Value::from(format!("user{i}")), slotql::Value::from(i)]))
        .chunk_size(2);
    assert_eq!(db.run_multi(&batch).await.unwrap(), 5);

    let page = qb::select("username, score")
        .from("users")
        .filter(Fields::new().cmp("score", ">=", 1))
        .unwrap()
        .order("score DESC")
        .limit(2);

    assert_eq!(db.find_count(&page, "*").await.unwrap(), 4);

    let names: Vec<String> = db.find_col(&page).await.unwrap();
    assert_eq!(names, vec!["user4", "user3"]);

    let pairs: Vec<(String, i32)> = db.find_assoc(&page).await.unwrap();
    assert_eq!(pairs, vec![("user4".to_string(), 4), ("user3".to_string(), 3)]);
}

#[tokio::test]
async fn raw_statements_and_bind_errors() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    create_users(&client).await;
    let db = Database::new(&client).with_config(DatabaseConfig::default().without_insert_id());

    let inserted = db
        .run(&qb::insert("users", Fields::new().set("username", "carol")).unwrap())
        .await
        .unwrap();
    assert_eq!(inserted, RunResult::RowsAffected(1));

    let n = db
        .run_raw(
            "UPDATE users SET email = :email WHERE username = :name",
            Some(&BindMap::new().with("email", "c@x").with("name", "carol")),
        )
        .await
        .unwrap();
    assert_eq!(n, 1);

    let err = db
        .run_raw("UPDATE users SET email = :email", None)
        .await
        .unwrap_err();
    assert!(matches!(err, QbError::MissingBind(ref name) if name == "email"));

    let dup = db
        .run(&qb::insert("users", Fields::new().set("username", "carol")).unwrap())
        .await
        .unwrap_err();
    assert!(dup.is_unique_violation());

    db.run(&qb::truncate("users")).await.unwrap();
    let left = db
        .find_count(&qb::select("*").from("users"), "*")
        .await
        .unwrap();
    assert_eq!(left, 0);
}

#[tokio::test]
async fn statement_timeout_cancels() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let db = Database::new(&client)
        .with_config(DatabaseConfig::default().with_query_timeout(Duration::from_millis(50)));

    let err = db
        .find_all(&qb::query("SELECT pg_sleep(2)"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}
