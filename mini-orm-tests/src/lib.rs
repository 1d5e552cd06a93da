//! Entities shared by the integration tests.

use chrono::NaiveDateTime;
use mini_orm::{
    Entity, Result,
    entity::{EntityDeclaration, FieldDeclaration, column::Value, identity::IdentityValue},
    query::parse::EntityRow,
};

#[derive(Entity, Debug, Clone, Default, PartialEq)]
#[entity(table = "Users")]
pub struct User {
    #[entity(id)]
    pub id: i64,
    #[entity(column)]
    pub username: String,
    #[entity(column)]
    pub password: String,
    #[entity(column)]
    pub age: i32,
    #[entity(column)]
    pub registration_date: NaiveDateTime,
}

impl User {
    pub fn new(username: &str, age: i32, registration_date: NaiveDateTime) -> Self {
        Self {
            id: 0,
            username: username.to_string(),
            password: format!("{username}-secret"),
            age,
            registration_date,
        }
    }
}

/// Every remaining column type, a narrow identity and a field the engine ignores.
#[derive(Entity, Debug, Clone, Default, PartialEq)]
#[entity(table = "Accounts")]
pub struct Account {
    #[entity(id)]
    pub id: Option<i32>,
    #[entity(column = "Owner")]
    pub owner: String,
    #[entity(column = "IsActive")]
    pub active: bool,
    #[entity(column)]
    pub balance: f64,
    #[entity(column)]
    pub visits: i64,
    pub cached_summary: Option<String>,
}

/// Nothing but an identity.
#[derive(Entity, Debug, Default)]
#[entity(table = "Markers")]
pub struct Marker {
    #[entity(id)]
    pub id: Option<i64>,
}

#[derive(Entity, Debug, Default)]
pub struct Unmapped {
    #[entity(id)]
    pub id: i64,
    #[entity(column)]
    pub name: String,
}

#[derive(Entity, Debug, Default)]
#[entity(table = "Keyless")]
pub struct Keyless {
    #[entity(column)]
    pub name: String,
}

#[derive(Entity, Debug, Default)]
#[entity(table = "   ")]
pub struct BlankTable {
    #[entity(id)]
    pub id: i64,
}

/// Declares a column whose type has no relational counterpart. The derive rejects such fields
/// at compile time, so this one is written by hand.
#[derive(Debug, Default)]
pub struct Attachment {
    pub id: i64,
    pub payload: Vec<u8>,
}

impl Entity for Attachment {
    const DECLARATION: EntityDeclaration = EntityDeclaration {
        name: "Attachment",
        table: Some("Attachments"),
        fields: &[
            FieldDeclaration {
                name: "id",
                type_name: "i64",
                column: None,
                identity: true,
            },
            FieldDeclaration {
                name: "payload",
                type_name: "Vec<u8>",
                column: Some("Payload"),
                identity: false,
            },
        ],
    };

    fn identity(&self) -> Option<i64> {
        self.id.get()
    }

    fn set_identity(&mut self, id: i64) -> Result<()> {
        self.id.set(id)
    }

    fn column_value(&self, _field: &str) -> Option<Value> {
        None
    }

    fn from_row(_row: &EntityRow<'_>) -> Result<Self> {
        Ok(Self::default())
    }
}
