//! Hand-written models shared by unit tests.

use crate::error::MetadataError;
use crate::field::{AttributeDecl, Cascade, EntityType, RelationDecl};
use crate::model::{AttributeValue, Model};
use crate::relationship::Related;
use crate::row::FromValue;
use crate::types::SqlType;
use crate::Result;

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
            AttributeDecl::column("name", SqlType::Text).nullable(false),
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
            "id" => self.id = FromValue::from_value(&value.into_scalar(Self::NAME, attribute)?)?,
            "name" => {
                self.name = FromValue::from_value(&value.into_scalar(Self::NAME, attribute)?)?;
            }
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Account {
    pub id: Option<i64>,
    pub user_name: String,
    pub active: bool,
    pub team: Related<Team>,
    pub login_attempts: u32,
    pub sessions: Vec<String>,
}

impl Model for Account {
    const NAME: &'static str = "Account";
    const TABLE: Option<&'static str> = Some("accounts");

    fn attributes() -> &'static [AttributeDecl] {
        static ATTRIBUTES: &[AttributeDecl] = &[
            AttributeDecl::column("id", SqlType::BigInt).id(),
            AttributeDecl::column("userName", SqlType::Text)
                .unique()
                .length(64),
            AttributeDecl::column("active", SqlType::Boolean).nullable(false),
            AttributeDecl::to_one(
                "team",
                RelationDecl::many_to_one(EntityType::of::<Team>(), "team_id")
                    .cascade(Cascade::PERSIST),
            ),
            AttributeDecl::transient("login_attempts"),
            AttributeDecl::to_many("sessions"),
        ];
        ATTRIBUTES
    }

    fn read(&self, attribute: &str) -> Result<AttributeValue> {
        match attribute {
            "id" => Ok(AttributeValue::Scalar(self.id.into())),
            "userName" => Ok(AttributeValue::Scalar(self.user_name.clone().into())),
            "active" => Ok(AttributeValue::Scalar(self.active.into())),
            "team" => Ok(AttributeValue::Related(self.team.to_erased())),
            other => Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
    }

    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()> {
        match attribute {
            "id" => self.id = FromValue::from_value(&value.into_scalar(Self::NAME, attribute)?)?,
            "userName" => {
                self.user_name =
                    FromValue::from_value(&value.into_scalar(Self::NAME, attribute)?)?;
            }
            "active" => {
                self.active = FromValue::from_value(&value.into_scalar(Self::NAME, attribute)?)?;
            }
            "team" => self.team = Related::from_erased(value.into_related())?,
            other => return Err(MetadataError::unknown_attribute(Self::NAME, other).into()),
        }
        Ok(())
    }
}
