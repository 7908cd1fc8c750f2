//! Invitation entity - An offer from a group owner to a user to join the group.
//!
//! `is_processed` flips to true exactly once; `is_accepted` then tells which
//! terminal state was reached. The pair (`group_id`, `recipient_id`) is unique.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invitation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invitations")]
pub struct Model {
    /// Unique identifier for the invitation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group the recipient is invited to
    pub group_id: i64,
    /// User who sent the invitation (the group owner at sending time)
    pub sender_id: i64,
    /// User who may accept or reject
    pub recipient_id: i64,
    /// Meaningful only once processed
    pub is_accepted: bool,
    /// Set once the recipient answered
    pub is_processed: bool,
    pub sent_at: DateTimeUtc,
    pub accepted_at: Option<DateTimeUtc>,
    pub rejected_at: Option<DateTimeUtc>,
}

/// Defines relationships between Invitation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each invitation targets one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
