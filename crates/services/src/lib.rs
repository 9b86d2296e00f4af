//! crates/services/src/lib.rs
//!
//! The calling layer of the forum core: resolves viewer access, enforces
//! lock and ownership rules, and delegates persistence to the domain ports.

pub mod access;
pub mod categories;
pub mod forum;
pub mod moderation;
pub mod posts;
pub mod replies;
pub mod validation;

pub use access::{accessible_tiers, can_access_category, viewer_scope};
pub use categories::CategoryService;
pub use forum::{Forum, ForumOptions};
pub use moderation::ModerationService;
pub use posts::{PostDraft, PostEdit, PostService};
pub use replies::{build_reply_tree, group_by_parent, ReplyDraft, ReplyNode, ReplyService};
