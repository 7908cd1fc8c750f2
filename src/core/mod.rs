//! Core business logic, independent of any transport.
//!
//! Every operation takes a `SeaORM` connection plus the id of the acting user
//! and returns [`crate::errors::Result`]. Authorization decisions are made by
//! [`access`]; the other modules load state, ask it, and write.

/// Pure access-control evaluator
pub mod access;
/// Barcode decoding seam for coupon images
pub mod barcode;
/// Coupon CRUD, sharing and redemption
pub mod coupon;
/// Group aggregate: group records, rosters, access passwords
pub mod group;
/// Invitation state machine
pub mod invitation;
/// Published shops and cloning them
pub mod marketplace;
/// Group members and shop links
pub mod membership;
/// Argon2 password hashing
pub mod password;
/// Shop CRUD, pinning and publishing
pub mod shop;
/// User lookup and seeding
pub mod user;
