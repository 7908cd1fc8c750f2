//! Shop entity - A store that coupons are attached to.
//!
//! A shop has exactly one owner for its whole lifetime. Listing it on the
//! marketplace and sharing it through groups are independent of each other.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shop database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shops")]
pub struct Model {
    /// Unique identifier for the shop
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who owns the shop; never changes after creation
    pub owner_id: i64,
    /// Display name (e.g., "Lidl", "Coffee Corner")
    pub title: String,
    /// Owner's personal bookmark
    pub is_pinned: bool,
    /// Whether other users may find and clone this shop
    pub is_on_marketplace: bool,
    /// When the shop was created
    pub created_at: DateTimeUtc,
    /// When the shop was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Shop and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each shop belongs to one owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    /// One shop has many coupons
    #[sea_orm(has_many = "super::coupon::Entity")]
    Coupons,
    /// One shop can be linked into many groups
    #[sea_orm(has_many = "super::shop_group::Entity")]
    ShopGroups,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupons.def()
    }
}

impl Related<super::shop_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShopGroups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
