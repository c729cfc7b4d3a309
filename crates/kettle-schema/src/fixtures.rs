//! Hand-written models for generator tests.

use chrono::NaiveDate;
use kettle_core::{
    AttributeDecl, AttributeValue, Cardinality, Cascade, EntityType, FromValue, MetadataError,
    Model, RelationDecl, Related, Result, SqlType,
};

fn scalar<T: FromValue>(entity: &'static str, attr: &str, value: AttributeValue) -> Result<T> {
    T::from_value(&value.into_scalar(entity, attr)?)
}

#[derive(Debug, Default)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
}

impl Model for Team {
    const NAME: &'static str = "Team";

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[
            AttributeDecl::column("id", SqlType::BigInt).id(),
            AttributeDecl::column("name", SqlType::Text)
                .nullable(false)
                .unique()
                .length(80),
        ];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            "name" => Ok(AttributeValue::Scalar(self.name.clone().into())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = scalar(Self::NAME, attribute, value)?,
            "name" => self.name = scalar(Self::NAME, attribute, value)?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Person {
    pub id: Option<i32>,
    pub born: Option<NaiveDate>,
    pub team: Related<Team>,
    pub nickname: String,
}

impl Model for Person {
    const NAME: &'static str = "Person";
    const TABLE: Option<&'static str> = Some("people");

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[
            AttributeDecl::column("id", SqlType::Integer).id(),
            AttributeDecl::column("born", SqlType::Date),
            AttributeDecl::to_one(
                "team",
                RelationDecl::many_to_one(EntityType::of::<Team>(), "team_id")
                    .cascade(Cascade::DELETE),
            ),
            AttributeDecl::transient("nickname"),
        ];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            "born" => Ok(AttributeValue::Scalar(self.born.into())),
            "team" => Ok(AttributeValue::Related(self.team.to_erased())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = scalar(Self::NAME, attribute, value)?,
            "born" => self.born = scalar(Self::NAME, attribute, value)?,
            "team" => self.team = Related::from_erased(value.into_related())?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Passport {
    pub id: Option<i64>,
    pub holder: Related<Person>,
}

impl Model for Passport {
    const NAME: &'static str = "Passport";

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[
            AttributeDecl::column("id", SqlType::BigInt).id(),
            AttributeDecl::to_one(
                "holder",
                RelationDecl::one_to_one(EntityType::of::<Person>(), "holder_id").lazy(),
            ),
        ];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            "holder" => Ok(AttributeValue::Related(self.holder.to_erased())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = scalar(Self::NAME, attribute, value)?,
            "holder" => self.holder = Related::from_erased(value.into_related())?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}

/// Relationship declared on a raw id field.
#[derive(Debug, Default)]
pub struct Card {
    pub id: Option<i64>,
    pub owner_id: Option<i64>,
}

impl Model for Card {
    const NAME: &'static str = "Card";

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[
            AttributeDecl::column("id", SqlType::BigInt).id(),
            AttributeDecl::to_one(
                "owner_id",
                RelationDecl::scalar(SqlType::BigInt, "owner_id", Cardinality::ManyToOne),
            ),
        ];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            "owner_id" => Ok(AttributeValue::Scalar(self.owner_id.into())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = scalar(Self::NAME, attribute, value)?,
            "owner_id" => self.owner_id = scalar(Self::NAME, attribute, value)?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}

/// Entity with nothing but its key.
#[derive(Debug, Default)]
pub struct Tag {
    pub id: Option<i64>,
}

impl Model for Tag {
    const NAME: &'static str = "Tag";

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[AttributeDecl::column("id", SqlType::BigInt).id()];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = scalar(Self::NAME, attribute, value)?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}
