//! Hand-written models and a SQLite-backed engine for session tests.

use crate::engine::Engine;
use chrono::NaiveDate;
use kettle_core::{
    AttributeDecl, AttributeValue, Cascade, EntityType, FromValue, MetadataError, Model,
    RelationDecl, Related, Result, SqlType,
};
use kettle_pool::{ConnectionPool, PoolConfig};
use kettle_schema::{DatabaseType, create_table};
use kettle_sqlite::{SqliteConfig, SqliteConnector};
use std::sync::Arc;
use tempfile::TempDir;

fn scalar<T: FromValue>(entity: &'static str, attr: &str, value: AttributeValue) -> Result<T> {
    T::from_value(&value.into_scalar(entity, attr)?)
}

#[derive(Debug, Default)]
pub struct Author {
    pub id: Option<i64>,
    pub name: String,
    pub nickname: String,
    pub books: Vec<String>,
    pub mentor: Related<Author>,
}

impl Model for Author {
    const NAME: &'static str = "Author";
    const TABLE: Option<&'static str> = Some("authors");

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[
            AttributeDecl::column("id", SqlType::BigInt).id(),
            AttributeDecl::column("name", SqlType::Text)
                .nullable(false)
                .unique(),
            AttributeDecl::transient("nickname"),
            AttributeDecl::to_many("books"),
            AttributeDecl::to_one(
                "mentor",
                RelationDecl::many_to_one(EntityType::of::<Author>(), "mentor_id").lazy(),
            ),
        ];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            "name" => Ok(AttributeValue::Scalar(self.name.clone().into())),
            "mentor" => Ok(AttributeValue::Related(self.mentor.to_erased())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = scalar(Self::NAME, attribute, value)?,
            "name" => self.name = scalar(Self::NAME, attribute, value)?,
            "mentor" => self.mentor = Related::from_erased(value.into_related())?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub author: Related<Author>,
    pub published: Option<NaiveDate>,
    pub in_print: bool,
}

impl Model for Book {
    const NAME: &'static str = "Book";
    const TABLE: Option<&'static str> = Some("books");

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[
            AttributeDecl::column("id", SqlType::BigInt).id(),
            AttributeDecl::column("title", SqlType::Text).nullable(false),
            AttributeDecl::to_one(
                "author",
                RelationDecl::many_to_one(EntityType::of::<Author>(), "author_id")
                    .cascade(Cascade::PERSIST),
            ),
            AttributeDecl::column("published", SqlType::Date),
            AttributeDecl::column("in_print", SqlType::Boolean).nullable(false),
        ];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            "title" => Ok(AttributeValue::Scalar(self.title.clone().into())),
            "author" => Ok(AttributeValue::Related(self.author.to_erased())),
            "published" => Ok(AttributeValue::Scalar(self.published.into())),
            "in_print" => Ok(AttributeValue::Scalar(self.in_print.into())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = scalar(Self::NAME, attribute, value)?,
            "title" => self.title = scalar(Self::NAME, attribute, value)?,
            "author" => self.author = Related::from_erased(value.into_related())?,
            "published" => self.published = scalar(Self::NAME, attribute, value)?,
            "in_print" => self.in_print = scalar(Self::NAME, attribute, value)?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}

/// Self-referencing eager one-to-one, for cycle tests.
#[derive(Debug, Default)]
pub struct Node {
    pub id: Option<i32>,
    pub label: String,
    pub partner: Related<Node>,
}

impl Model for Node {
    const NAME: &'static str = "Node";

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[
            AttributeDecl::column("id", SqlType::Integer).id(),
            AttributeDecl::column("label", SqlType::Text),
            AttributeDecl::to_one(
                "partner",
                RelationDecl::one_to_one(EntityType::of::<Node>(), "partner_id")
                    .cascade(Cascade::PERSIST),
            ),
        ];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            "label" => Ok(AttributeValue::Scalar(self.label.clone().into())),
            "partner" => Ok(AttributeValue::Related(self.partner.to_erased())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = scalar(Self::NAME, attribute, value)?,
            "label" => self.label = scalar(Self::NAME, attribute, value)?,
            "partner" => self.partner = Related::from_erased(value.into_related())?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}

/// Engine over a fresh SQLite file with every fixture table created.
pub fn engine(pool_size: usize) -> (TempDir, Arc<Engine>) {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteConfig::file(dir.path().join("session.db").to_string_lossy());
    let pool = ConnectionPool::create(
        Arc::new(SqliteConnector::new(config)),
        PoolConfig::new(pool_size).acquire_timeout(2_000),
    )
    .unwrap();
    let engine = Arc::new(Engine::new(pool, DatabaseType::Sqlite.dialect()));

    {
        let mut conn = engine.pool().acquire().unwrap();
        for meta in [
            kettle_core::metadata::resolve::<Author>().unwrap(),
            kettle_core::metadata::resolve::<Book>().unwrap(),
            kettle_core::metadata::resolve::<Node>().unwrap(),
        ] {
            let ddl = create_table(&meta, engine.dialect()).unwrap();
            conn.execute(&ddl, &[]).unwrap();
        }
    }
    (dir, engine)
}
