//! # Domain Models
//!
//! These structs represent the core entities of the forum.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Visibility tier gating a category. Declared in ascending order, but access
/// checks treat a user's tiers as a label set, not a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityTier {
    Public,
    Actor,
    Professional,
    Vip,
}

/// The set of tiers a viewer may see.
pub type TierSet = BTreeSet<VisibilityTier>;

/// Which categories a viewer's reads may draw from. Stores apply it before
/// any `LIMIT` so gated rows never crowd out visible ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerScope {
    pub tiers: TierSet,
    /// Admins still see rows in deactivated categories
    pub include_inactive: bool,
}

impl ViewerScope {
    pub fn admits(&self, access_level: VisibilityTier, is_active: bool) -> bool {
        (is_active || self.include_inactive) && self.tiers.contains(&access_level)
    }
}

impl VisibilityTier {
    pub const ALL: [VisibilityTier; 4] = [
        VisibilityTier::Public,
        VisibilityTier::Actor,
        VisibilityTier::Professional,
        VisibilityTier::Vip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Actor => "actor",
            Self::Professional => "professional",
            Self::Vip => "vip",
        }
    }
}

impl fmt::Display for VisibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "actor" => Ok(Self::Actor),
            "professional" => Ok(Self::Professional),
            "vip" => Ok(Self::Vip),
            other => Err(DomainError::validation(format!(
                "unknown access level '{other}'"
            ))),
        }
    }
}

/// Account role as issued by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Actor,
    Agent,
    CastingDirector,
    Investor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Actor => "actor",
            Self::Agent => "agent",
            Self::CastingDirector => "casting_director",
            Self::Investor => "investor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "actor" => Ok(Self::Actor),
            "agent" => Ok(Self::Agent),
            "casting_director" => Ok(Self::CastingDirector),
            "investor" => Ok(Self::Investor),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated viewer. Anonymous viewers are represented by `None`
/// wherever a `ForumUser` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumUser {
    pub id: Uuid,
    pub role: Role,
    #[serde(default)]
    pub is_verified_professional: bool,
    #[serde(default)]
    pub is_investor: bool,
}

impl ForumUser {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            role,
            is_verified_professional: false,
            is_investor: false,
        }
    }

    pub fn verified_professional(mut self, verified: bool) -> Self {
        self.is_verified_professional = verified;
        self
    }

    pub fn investor(mut self, investor: bool) -> Self {
        self.is_investor = investor;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A named discussion bucket (e.g., "general", "vip-lounge").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    /// URL-safe, unique
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Tier required to see or post in this category
    pub access_level: VisibilityTier,
    /// Inactive categories are never listed
    pub is_active: bool,
    pub sort_order: i32,
    pub thread_count: i64,
    /// Posts plus replies
    pub post_count: i64,
    /// Most recent post or reply anywhere in the category
    pub last_post_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub access_level: VisibilityTier,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}

impl NewCategory {
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        access_level: VisibilityTier,
    ) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            access_level,
            is_active: true,
            sort_order: 0,
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub access_level: Option<VisibilityTier>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.slug.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.access_level.is_none()
            && self.is_active.is_none()
            && self.sort_order.is_none()
    }

    /// Applies the supplied fields to `category` in place.
    pub fn apply_to(&self, category: &mut Category) {
        if let Some(slug) = &self.slug {
            category.slug = slug.clone();
        }
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(description) = &self.description {
            category.description = description.clone();
        }
        if let Some(access_level) = self.access_level {
            category.access_level = access_level;
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
        if let Some(sort_order) = self.sort_order {
            category.sort_order = sort_order;
        }
    }
}

/// A top-level discussion thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub category_id: Uuid,
    /// Author
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub pinned: bool,
    /// Locked threads reject replies from non-admins
    pub locked: bool,
    pub view_count: i64,
    /// Direct and nested replies
    pub reply_count: i64,
    /// Initialised to the creation time, bumped by every reply
    pub last_reply_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub category_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub pinned: Option<bool>,
    pub locked: Option<bool>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.pinned.is_none()
            && self.locked.is_none()
    }

    pub fn apply_to(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(pinned) = self.pinned {
            post.pinned = pinned;
        }
        if let Some(locked) = self.locked {
            post.locked = locked;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub access_level: VisibilityTier,
    pub is_active: bool,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            slug: category.slug.clone(),
            name: category.name.clone(),
            access_level: category.access_level,
            is_active: category.is_active,
        }
    }
}

/// Profile row owned by the host application's user table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub user_id: Uuid,
    pub name: String,
    pub display_name: Option<String>,
    pub role: String,
    pub signature: Option<String>,
}

/// Author block attached to posts and replies on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub user_id: Uuid,
    /// `None` when the user row no longer exists
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub signature: Option<String>,
    /// Filled by the `AvatarResolver`, never by a store
    pub avatar_url: Option<String>,
}

impl AuthorSummary {
    pub fn unknown(user_id: Uuid) -> Self {
        Self {
            user_id,
            name: None,
            display_name: None,
            role: None,
            signature: None,
            avatar_url: None,
        }
    }
}

impl From<&AuthorProfile> for AuthorSummary {
    fn from(profile: &AuthorProfile) -> Self {
        Self {
            user_id: profile.user_id,
            name: Some(profile.name.clone()),
            display_name: profile.display_name.clone(),
            role: Some(profile.role.clone()),
            signature: profile.signature.clone(),
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub category: CategorySummary,
    pub author: AuthorSummary,
}

/// A message attached to a post, optionally nested under another reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub post_id: Uuid,
    /// Non-owning back-reference; may dangle once the parent is deleted
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReply {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyDetail {
    #[serde(flatten)]
    pub reply: Reply,
    pub author: AuthorSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentReply {
    #[serde(flatten)]
    pub reply: Reply,
    pub post_title: String,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Pin,
    Unpin,
    Lock,
    Unlock,
    DeletePost,
    DeleteReply,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pin => "pin",
            Self::Unpin => "unpin",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::DeletePost => "delete_post",
            Self::DeleteReply => "delete_reply",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pin" => Ok(Self::Pin),
            "unpin" => Ok(Self::Unpin),
            "lock" => Ok(Self::Lock),
            "unlock" => Ok(Self::Unlock),
            "delete_post" => Ok(Self::DeletePost),
            "delete_reply" => Ok(Self::DeleteReply),
            other => Err(DomainError::validation(format!(
                "unknown moderation action '{other}'"
            ))),
        }
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationEvent {
    pub id: Uuid,
    /// Not a foreign key: the post may already be gone
    pub post_id: Uuid,
    /// `None` for system actions
    pub performed_by: Option<Uuid>,
    pub action: ModerationAction,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewModerationEvent {
    pub post_id: Uuid,
    pub performed_by: Option<Uuid>,
    pub action: ModerationAction,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}
