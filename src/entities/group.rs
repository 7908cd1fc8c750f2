//! Group entity - A shared collection of shops with a member list.
//!
//! The owner is never stored as a membership row; membership rows describe
//! non-owner members only.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    /// Unique identifier for the group
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who created and administers the group
    pub owner_id: i64,
    /// Display name of the group
    pub title: String,
    /// Owner's personal bookmark
    pub is_pinned: bool,
    /// Argon2 PHC string; `None` when joining needs no password
    #[serde(skip_serializing)]
    pub access_password: Option<String>,
    /// When the group was created
    pub created_at: DateTimeUtc,
    /// When the group was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Group and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each group belongs to one owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    /// One group has many membership rows
    #[sea_orm(has_many = "super::group_membership::Entity")]
    Memberships,
    /// One group has many shop links
    #[sea_orm(has_many = "super::shop_group::Entity")]
    ShopGroups,
    /// One group has many invitations
    #[sea_orm(has_many = "super::invitation::Entity")]
    Invitations,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::group_membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::shop_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShopGroups.def()
    }
}

impl Related<super::invitation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invitations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
