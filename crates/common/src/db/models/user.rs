//! User account entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    #[sea_orm(column_type = "Text", unique)]
    pub username: String,

    #[sea_orm(column_type = "Text")]
    pub first_name: String,

    #[sea_orm(column_type = "Text")]
    pub last_name: String,

    /// Argon2 PHC string
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub is_active: bool,

    pub is_staff: bool,

    pub is_superuser: bool,

    pub date_joined: DateTimeWithTimeZone,

    pub last_login: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// "First Last", falling back to the username
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::feedback::Entity")]
    Feedback,

    #[sea_orm(has_many = "super::text_submission::Entity")]
    TextSubmissions,

    #[sea_orm(has_many = "super::image_submission::Entity")]
    ImageSubmissions,
}

impl Related<super::feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

impl Related<super::text_submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TextSubmissions.def()
    }
}

impl Related<super::image_submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImageSubmissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
