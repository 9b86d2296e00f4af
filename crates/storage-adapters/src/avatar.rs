//! Avatar URL formatting for author summaries.

use domains::AvatarResolver;
use uuid::Uuid;

/// Builds `{url_prefix}/{user_id}`; the media service behind the prefix is
/// responsible for serving a default image for users without an upload.
#[derive(Debug, Clone)]
pub struct PathAvatarResolver {
    url_prefix: String,
}

impl PathAvatarResolver {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_owned();
        Self { url_prefix }
    }
}

impl AvatarResolver for PathAvatarResolver {
    fn avatar_url(&self, user_id: Uuid) -> String {
        format!("{}/{}", self.url_prefix, user_id)
    }
}
