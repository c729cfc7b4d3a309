//! Models and database setup shared by the SQLite integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use kettle::{DataSource, Database, Related};
use tempfile::TempDir;

#[derive(kettle::Model, Debug, Default)]
#[kettle(table = "users")]
pub struct User {
    #[kettle(id)]
    pub id: Option<i64>,
    #[kettle(unique, length = 64)]
    pub username: String,
    pub password: String,
    #[kettle(transient)]
    pub login_attempts: u32,
    #[kettle(one_to_many)]
    pub roles: Vec<String>,
}

impl User {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }
}

#[derive(kettle::Model, Debug, Default)]
#[kettle(table = "teams")]
pub struct Team {
    #[kettle(id)]
    pub id: Option<i64>,
    #[kettle(unique)]
    pub name: String,
}

#[derive(kettle::Model, Debug, Default)]
#[kettle(table = "heroes")]
pub struct Hero {
    #[kettle(id)]
    pub id: Option<i64>,
    pub name: String,
    #[kettle(column = "first_seen")]
    pub debut: Option<NaiveDate>,
    #[kettle(many_to_one(join_column = "team_id", cascade(persist)))]
    pub team: Related<Team>,
}

#[derive(kettle::Model, Debug, Default)]
#[kettle(table = "owners")]
pub struct Owner {
    #[kettle(id)]
    pub id: Option<i32>,
    pub name: String,
}

#[derive(kettle::Model, Debug, Default)]
#[kettle(table = "pets")]
pub struct Pet {
    #[kettle(id)]
    pub id: Option<i32>,
    pub name: String,
    #[kettle(many_to_one(join_column = "owner_id", fetch = "lazy"))]
    pub owner: Related<Owner>,
}

/// Log output for a failing test: `RUST_LOG=kettle_session=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh SQLite file with every test table created.
pub fn database(pool_size: usize) -> (TempDir, Database) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kettle.db");
    let source = DataSource::sqlite(path.to_string_lossy())
        .pool_size(pool_size)
        .acquire_timeout(2_000);
    let db = Database::connect(source).unwrap();

    db.create_table::<User>().unwrap();
    db.create_table::<Team>().unwrap();
    db.create_table::<Hero>().unwrap();
    db.create_table::<Owner>().unwrap();
    db.create_table::<Pet>().unwrap();
    (dir, db)
}

pub fn count(db: &Database, table: &str) -> i64 {
    let mut conn = db.pool().acquire().unwrap();
    let rows = conn
        .query(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
        .unwrap();
    rows[0].get_named::<i64>("n").unwrap()
}
