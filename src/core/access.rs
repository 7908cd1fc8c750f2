//! Access control - decides whether an actor may perform an action on an entity.
//!
//! Everything in this module is pure: the caller loads the entity and the
//! rosters of the groups that could grant visibility, and the evaluator only
//! reads them. Rules are independent; an action is denied unless some rule
//! grants it. Callers turn a denial into [`Error::Forbidden`] with [`ensure`].

use crate::{
    entities::{coupon, group, invitation, shop},
    errors::{Error, Result},
};
use std::collections::BTreeSet;

/// Identifier of an authenticated user.
pub type UserId = i64;

/// Owner and non-owner members of a single group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    /// Group the roster describes
    pub group_id: i64,
    /// The group owner, a member for authorization purposes
    pub owner_id: UserId,
    /// Users with a membership row
    pub member_ids: BTreeSet<UserId>,
}

impl Roster {
    /// Creates a roster from the owner and the ids found in membership rows.
    pub fn new(group_id: i64, owner_id: UserId, member_ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            group_id,
            owner_id,
            member_ids: member_ids.into_iter().collect(),
        }
    }

    /// Whether `user` is the owner or has a membership row.
    #[must_use]
    pub fn includes(&self, user: UserId) -> bool {
        self.owner_id == user || self.member_ids.contains(&user)
    }

    /// Whether `user` has a membership row (never true for the owner).
    #[must_use]
    pub fn has_membership(&self, user: UserId) -> bool {
        self.owner_id != user && self.member_ids.contains(&user)
    }

    /// Number of users in the roster, owner included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.member_ids.len() + usize::from(!self.member_ids.contains(&self.owner_id))
    }

    /// A roster always contains its owner.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopAction {
    View,
    Update,
    Delete,
    Pin,
    Unpin,
    Publish,
    Unpublish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponAction {
    View,
    Update,
    Delete,
    Share,
    Unshare,
    MarkUsed,
    MarkUnused,
    Pin,
    Unpin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    View,
    Update,
    Delete,
    Pin,
    Unpin,
    Invite,
    AddMember,
    RemoveMember,
    AddShop,
    RemoveShop,
    /// Toggle the pin on a shop link inside the group
    PinShop,
    /// Toggle the actor's own membership pin
    PinMembership,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationAction {
    View,
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingAction {
    View,
    /// Clone the listed shop into the actor's account
    Use,
}

/// Any action the evaluator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shop(ShopAction),
    Coupon(CouponAction),
    Group(GroupAction),
    Invitation(InvitationAction),
    Listing(ListingAction),
}

/// The entity an action targets, with the state needed to judge it.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Shop {
        shop: &'a shop::Model,
        /// Rosters of the groups the shop is linked into
        rosters: &'a [Roster],
    },
    Coupon {
        coupon: &'a coupon::Model,
        /// Rosters of the groups the coupon's shop is linked into
        rosters: &'a [Roster],
    },
    Group {
        group: &'a group::Model,
        roster: &'a Roster,
    },
    Invitation(&'a invitation::Model),
    Listing(&'a shop::Model),
}

/// Decides whether `actor` may perform `action` on `subject`.
///
/// `actor` is `None` for an anonymous request; the only thing an anonymous
/// actor may do is view a shared coupon. An action that does not belong to the
/// subject's entity type is denied.
#[must_use]
pub fn can(actor: Option<UserId>, action: Action, subject: &Subject<'_>) -> bool {
    match (action, *subject) {
        (Action::Coupon(action), Subject::Coupon { coupon, rosters }) => {
            can_coupon(actor, action, coupon, rosters)
        }
        (Action::Shop(action), Subject::Shop { shop, rosters }) => {
            actor.is_some_and(|user| can_shop(user, action, shop, rosters))
        }
        (Action::Group(action), Subject::Group { group, roster }) => {
            actor.is_some_and(|user| can_group(user, action, group, roster))
        }
        (Action::Invitation(action), Subject::Invitation(invitation)) => {
            actor.is_some_and(|user| can_invitation(user, action, invitation))
        }
        (Action::Listing(action), Subject::Listing(shop)) => {
            actor.is_some_and(|user| can_listing(user, action, shop))
        }
        _ => false,
    }
}

/// Shop rules: the owner may do everything, group members may view.
#[must_use]
pub fn can_shop(actor: UserId, action: ShopAction, shop: &shop::Model, rosters: &[Roster]) -> bool {
    if shop.owner_id == actor {
        return true;
    }
    action == ShopAction::View && rosters.iter().any(|roster| roster.includes(actor))
}

/// Coupon rules: shared coupons are public, otherwise owner does everything and
/// members of a group holding the coupon's shop may view.
#[must_use]
pub fn can_coupon(
    actor: Option<UserId>,
    action: CouponAction,
    coupon: &coupon::Model,
    rosters: &[Roster],
) -> bool {
    if action == CouponAction::View && coupon.is_shared {
        return true;
    }
    let Some(actor) = actor else {
        return false;
    };
    if coupon.owner_id == actor {
        return true;
    }
    action == CouponAction::View && rosters.iter().any(|roster| roster.includes(actor))
}

/// Group rules: owner administers, any member views, non-owner members manage
/// their own membership.
#[must_use]
pub fn can_group(actor: UserId, action: GroupAction, group: &group::Model, roster: &Roster) -> bool {
    let is_owner = group.owner_id == actor;
    match action {
        GroupAction::View => is_owner || roster.includes(actor),
        GroupAction::PinMembership | GroupAction::Leave => !is_owner && roster.has_membership(actor),
        GroupAction::Update
        | GroupAction::Delete
        | GroupAction::Pin
        | GroupAction::Unpin
        | GroupAction::Invite
        | GroupAction::AddMember
        | GroupAction::RemoveMember
        | GroupAction::AddShop
        | GroupAction::RemoveShop
        | GroupAction::PinShop => is_owner,
    }
}

/// Invitation rules: only the recipient, only while unprocessed.
#[must_use]
pub fn can_invitation(actor: UserId, _action: InvitationAction, invitation: &invitation::Model) -> bool {
    invitation.recipient_id == actor && !invitation.is_processed
}

/// Marketplace rules: any authenticated user, only while the shop is listed.
#[must_use]
pub fn can_listing(_actor: UserId, _action: ListingAction, shop: &shop::Model) -> bool {
    shop.is_on_marketplace
}

/// Turns a denial into [`Error::Forbidden`].
pub fn ensure(allowed: bool) -> Result<()> {
    if allowed { Ok(()) } else { Err(Error::Forbidden) }
}
