//! Coupon entity - A loyalty card or voucher with a barcode and an amount.
//!
//! The coupon's owner is whoever created it, which need not be the owner of the
//! shop it references (members of a group can add coupons to a shared shop).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coupon database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    /// Unique identifier for the coupon
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who created the coupon
    pub owner_id: i64,
    /// Shop the coupon can be redeemed at
    pub store_id: i64,
    /// Optional display name
    pub title: Option<String>,
    /// Barcode payload as text
    pub barcode: String,
    /// Whether the coupon has been redeemed
    pub is_used: bool,
    /// Owner's personal bookmark
    pub is_pinned: bool,
    /// Whether the coupon is reachable through its public link
    pub is_shared: bool,
    /// Monetary value, non-negative, two decimal places
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount: Decimal,
    /// When the coupon was created
    pub created_at: DateTimeUtc,
    /// When the coupon was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Coupon and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each coupon belongs to one shop
    #[sea_orm(
        belongs_to = "super::shop::Entity",
        from = "Column::StoreId",
        to = "super::shop::Column::Id",
        on_delete = "Cascade"
    )]
    Store,
    /// Each coupon belongs to one owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::shop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
