//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod coupon;
pub mod group;
pub mod group_membership;
pub mod invitation;
pub mod shop;
pub mod shop_group;
pub mod user;

// Re-export specific types to avoid conflicts
pub use coupon::{Column as CouponColumn, Entity as Coupon, Model as CouponModel};
pub use group::{Column as GroupColumn, Entity as Group, Model as GroupModel};
pub use group_membership::{
    Column as GroupMembershipColumn, Entity as GroupMembership, Model as GroupMembershipModel,
};
pub use invitation::{Column as InvitationColumn, Entity as Invitation, Model as InvitationModel};
pub use shop::{Column as ShopColumn, Entity as Shop, Model as ShopModel};
pub use shop_group::{Column as ShopGroupColumn, Entity as ShopGroup, Model as ShopGroupModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
