//! # Access Policy
//!
//! The single authority on category visibility. Every listing, detail and
//! reply path asks `accessible_tiers` instead of re-deriving role checks.

use domains::{DomainError, ForumUser, Result, Role, TierSet, ViewerScope, VisibilityTier};
use uuid::Uuid;

/// Tiers a viewer may see. Anonymous viewers only get `public`.
pub fn accessible_tiers(user: Option<&ForumUser>) -> TierSet {
    let mut tiers = TierSet::from([VisibilityTier::Public]);
    let Some(user) = user else {
        return tiers;
    };

    match user.role {
        Role::Admin => tiers.extend(VisibilityTier::ALL),
        Role::Actor => {
            tiers.insert(VisibilityTier::Actor);
        }
        Role::Agent | Role::CastingDirector => {
            tiers.insert(VisibilityTier::Professional);
            if user.is_verified_professional {
                tiers.insert(VisibilityTier::Vip);
            }
        }
        Role::Investor => {
            tiers.insert(VisibilityTier::Vip);
        }
    }

    // investor flag grants vip regardless of role
    if user.is_investor {
        tiers.insert(VisibilityTier::Vip);
    }

    tiers
}

pub fn can_access_category(user: Option<&ForumUser>, tier: VisibilityTier) -> bool {
    accessible_tiers(user).contains(&tier)
}

/// Tiers plus the inactive-category exemption admins get.
pub fn viewer_scope(user: Option<&ForumUser>) -> ViewerScope {
    ViewerScope {
        tiers: accessible_tiers(user),
        include_inactive: user.is_some_and(ForumUser::is_admin),
    }
}

/// The one gate every category, post and reply path goes through. Inactive
/// categories look missing to non-admins; inaccessible tiers are forbidden.
pub(crate) fn require_visible_category(
    user: Option<&ForumUser>,
    category_id: Uuid,
    tier: VisibilityTier,
    is_active: bool,
) -> Result<()> {
    if !is_active && !user.is_some_and(ForumUser::is_admin) {
        return Err(DomainError::not_found("Category", category_id));
    }
    require_category_access(user, tier)
}

fn require_category_access(user: Option<&ForumUser>, tier: VisibilityTier) -> Result<()> {
    if can_access_category(user, tier) {
        Ok(())
    } else {
        Err(DomainError::authorization(format!(
            "the '{tier}' tier is not available to this account"
        )))
    }
}

pub(crate) fn require_admin(user: &ForumUser, action: &str) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(DomainError::authorization(format!("only admins may {action}")))
    }
}

pub(crate) fn require_author_or_admin(
    user: &ForumUser,
    author_id: Uuid,
    action: &str,
) -> Result<()> {
    if user.is_admin() || user.id == author_id {
        Ok(())
    } else {
        Err(DomainError::authorization(format!(
            "only the author or an admin may {action}"
        )))
    }
}
