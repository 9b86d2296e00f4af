//! End-to-end flows through the services against the in-memory store.

use std::time::Duration;

use domains::{
    AuthorProfile, CategoryPatch, DomainError, ModerationAction, Role, VisibilityTier,
};
use integration_tests::{admin, user, TestForum, AVATAR_PREFIX};
use services::{accessible_tiers, PostEdit, ReplyDraft};
use uuid::Uuid;

fn draft(post_id: Uuid, content: &str, parent_id: Option<Uuid>) -> ReplyDraft {
    ReplyDraft {
        post_id,
        content: content.to_owned(),
        parent_id,
    }
}

#[tokio::test]
async fn posting_and_replying_keep_counters_in_step() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();

    // new thread
    let post = t.post(&author, general.id, "Hello").await.unwrap();
    let category = t.reload_category(general.id).await.unwrap();
    assert_eq!(category.thread_count, 1);
    assert_eq!(category.post_count, 1);
    assert!(category.last_post_at.is_some());

    // first reply
    tokio::time::sleep(Duration::from_millis(2)).await;
    let reply = t
        .forum
        .replies
        .create(&author, draft(post.id, "World", None))
        .await
        .unwrap();
    let detail = t.forum.posts.view(None, post.id).await.unwrap();
    assert_eq!(detail.post.reply_count, 1);
    assert!(detail.post.last_reply_at > post.last_reply_at);
    assert_eq!(t.reload_category(general.id).await.unwrap().post_count, 2);

    // reply removed again
    t.forum.moderation.delete_reply(&author, reply.id).await.unwrap();
    let detail = t.forum.posts.view(None, post.id).await.unwrap();
    assert_eq!(detail.post.reply_count, 0);
    let category = t.reload_category(general.id).await.unwrap();
    assert_eq!(category.thread_count, 1);
    assert_eq!(category.post_count, 1);
}

#[tokio::test]
async fn deleting_a_thread_resets_category_counters() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, general.id, "Hello").await.unwrap();

    t.forum.moderation.delete_post(&author, post.id).await.unwrap();

    let category = t.reload_category(general.id).await.unwrap();
    assert_eq!(category.thread_count, 0);
    assert_eq!(category.post_count, 0);
    assert!(t.forum.posts.list_by_category(None, general.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_thread_with_replies_removes_them_too() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, general.id, "Hello").await.unwrap();
    let mut reply_ids = Vec::new();
    for n in 0..3 {
        let reply = t
            .forum
            .replies
            .create(&author, draft(post.id, &format!("reply {n}"), None))
            .await
            .unwrap();
        reply_ids.push(reply.id);
    }
    assert_eq!(t.reload_category(general.id).await.unwrap().post_count, 4);

    t.forum.moderation.delete_post(&admin(), post.id).await.unwrap();

    let category = t.reload_category(general.id).await.unwrap();
    assert_eq!((category.thread_count, category.post_count), (0, 0));
    for id in reply_ids {
        let err = t.forum.replies.get(None, id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}

#[test]
fn agent_verification_unlocks_vip() {
    let agent = user(Role::Agent);
    assert_eq!(
        accessible_tiers(Some(&agent)).into_iter().collect::<Vec<_>>(),
        vec![VisibilityTier::Public, VisibilityTier::Professional]
    );

    let verified = agent.verified_professional(true);
    assert_eq!(
        accessible_tiers(Some(&verified)).into_iter().collect::<Vec<_>>(),
        vec![
            VisibilityTier::Public,
            VisibilityTier::Professional,
            VisibilityTier::Vip
        ]
    );
    assert_eq!(accessible_tiers(Some(&verified)), accessible_tiers(Some(&verified)));
}

#[tokio::test]
async fn pinned_then_quiet_then_most_recently_active() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();

    let pinned = t.post(&author, general.id, "House rules").await.unwrap();
    t.forum.moderation.pin(&admin(), pinned.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;

    let active = t.post(&author, general.id, "Casting call").await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let quiet = t.post(&author, general.id, "Anyone here?").await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    t.forum
        .replies
        .create(&author, draft(active.id, "Yes!", None))
        .await
        .unwrap();

    let order: Vec<Uuid> = t
        .forum
        .posts
        .list_by_category(None, general.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(order, vec![pinned.id, quiet.id, active.id]);
}

#[tokio::test]
async fn created_rows_read_back_unchanged() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    t.store.upsert_author(AuthorProfile {
        user_id: author.id,
        name: "Dana".into(),
        display_name: Some("Dana R.".into()),
        role: "actor".into(),
        signature: None,
    });

    let lounge = t.category("actors-lounge", VisibilityTier::Actor).await.unwrap();
    let fetched = t.forum.categories.get_by_id(lounge.id).await.unwrap().unwrap();
    assert_eq!(fetched.slug, "actors-lounge");
    assert_eq!(fetched.access_level, VisibilityTier::Actor);
    assert!(fetched.is_active);

    let post = t.post(&author, lounge.id, "Monologue swap").await.unwrap();
    let detail = t.forum.posts.view(Some(&author), post.id).await.unwrap();
    assert_eq!(detail.post.title, "Monologue swap");
    assert_eq!(detail.post.content, "Monologue swap body");
    assert_eq!(detail.post.category_id, lounge.id);
    assert_eq!(detail.post.user_id, author.id);
    assert_eq!(detail.category.slug, "actors-lounge");
    assert_eq!(detail.author.display_name.as_deref(), Some("Dana R."));
    assert_eq!(
        detail.author.avatar_url,
        Some(format!("{AVATAR_PREFIX}/{}", author.id))
    );

    let reply = t
        .forum
        .replies
        .create(&author, draft(post.id, "I'll bring Chekhov", None))
        .await
        .unwrap();
    let read = t.forum.replies.get(Some(&author), reply.id).await.unwrap();
    assert_eq!(read.reply.content, "I'll bring Chekhov");
    assert_eq!(read.reply.post_id, post.id);
    assert_eq!(read.reply.parent_id, None);
    assert_eq!(read.author.name.as_deref(), Some("Dana"));
}

#[tokio::test]
async fn empty_patches_leave_rows_untouched() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, general.id, "Hello").await.unwrap();

    let category = t
        .forum
        .categories
        .update(&admin(), general.id, CategoryPatch::default())
        .await
        .unwrap();
    assert_eq!(category.slug, general.slug);
    assert_eq!(category.name, general.name);
    assert_eq!(category.thread_count, 1);

    let edited = t
        .forum
        .posts
        .edit(&author, post.id, PostEdit::default())
        .await
        .unwrap();
    assert_eq!(edited.title, post.title);
    assert_eq!(edited.content, post.content);
}

#[tokio::test]
async fn deleting_missing_rows_is_a_no_op() {
    let t = TestForum::new();
    let missing = Uuid::now_v7();

    t.forum.moderation.delete_post(&admin(), missing).await.unwrap();
    t.forum.moderation.delete_reply(&admin(), missing).await.unwrap();
    t.forum.categories.delete(&admin(), missing).await.unwrap();
    assert!(t.store.moderation_events().await.is_empty());
}

#[tokio::test]
async fn blank_search_returns_nothing() {
    let t = TestForum::new();
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    t.post(&user(Role::Actor), general.id, "Hello").await.unwrap();

    assert!(t.forum.posts.search(None, "").await.unwrap().is_empty());
    assert!(t.forum.posts.search(None, "   ").await.unwrap().is_empty());
    assert_eq!(t.forum.posts.search(None, "hello").await.unwrap().len(), 1);
}

#[tokio::test]
async fn search_respects_viewer_tiers() {
    let t = TestForum::new();
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let vip = t.category("vip-lounge", VisibilityTier::Vip).await.unwrap();
    let investor = user(Role::Investor);
    t.post(&investor, general.id, "Funding news").await.unwrap();
    t.post(&investor, vip.id, "Funding round details").await.unwrap();

    assert_eq!(t.forum.posts.search(None, "funding").await.unwrap().len(), 1);
    assert_eq!(
        t.forum.posts.search(Some(&investor), "funding").await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn tier_gated_categories_are_hidden_and_forbidden() {
    let t = TestForum::new();
    t.category("general", VisibilityTier::Public).await.unwrap();
    let pros = t
        .category("industry-professionals", VisibilityTier::Professional)
        .await
        .unwrap();
    let actor = user(Role::Actor);

    let visible: Vec<String> = t
        .forum
        .categories
        .list(Some(&actor))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.slug)
        .collect();
    assert_eq!(visible, vec!["general".to_owned()]);

    let err = t
        .forum
        .categories
        .require_by_slug(Some(&actor), "industry-professionals")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));

    let err = t.post(&actor, pros.id, "Let me in").await.unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
}

#[tokio::test]
async fn inactive_categories_look_missing_to_members() {
    let t = TestForum::new();
    let archive = t.category("archive", VisibilityTier::Public).await.unwrap();
    t.forum
        .categories
        .update(
            &admin(),
            archive.id,
            CategoryPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(t.forum.categories.list(None).await.unwrap().is_empty());
    let err = t
        .forum
        .categories
        .require_by_slug(Some(&user(Role::Actor)), "archive")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
    assert!(t
        .forum
        .categories
        .require_by_slug(Some(&admin()), "archive")
        .await
        .is_ok());
}

#[tokio::test]
async fn locked_threads_only_take_admin_replies() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, general.id, "Heated").await.unwrap();

    let locked = t.forum.moderation.lock(&admin(), post.id).await.unwrap();
    assert!(locked.locked);

    let err = t
        .forum
        .replies
        .create(&author, draft(post.id, "one more thing", None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));

    t.forum
        .replies
        .create(&admin(), draft(post.id, "Closing this thread.", None))
        .await
        .unwrap();

    t.forum.moderation.unlock(&admin(), post.id).await.unwrap();
    t.forum
        .replies
        .create(&author, draft(post.id, "thanks", None))
        .await
        .unwrap();
}

#[tokio::test]
async fn only_admins_moderate() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, general.id, "Hello").await.unwrap();

    let err = t.forum.moderation.pin(&author, post.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));

    let stranger = user(Role::Actor);
    let err = t
        .forum
        .moderation
        .delete_post(&stranger, post.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
}

#[tokio::test]
async fn moderation_actions_are_audited() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let moderator = admin();
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, general.id, "Hello").await.unwrap();
    let reply = t
        .forum
        .replies
        .create(&author, draft(post.id, "hi", None))
        .await
        .unwrap();

    t.forum.moderation.pin(&moderator, post.id).await.unwrap();
    t.forum.moderation.lock(&moderator, post.id).await.unwrap();
    t.forum.moderation.delete_reply(&moderator, reply.id).await.unwrap();
    t.forum.moderation.delete_post(&moderator, post.id).await.unwrap();

    let events = t.store.moderation_events().await;
    let actions: Vec<ModerationAction> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            ModerationAction::Pin,
            ModerationAction::Lock,
            ModerationAction::DeleteReply,
            ModerationAction::DeletePost,
        ]
    );
    assert!(events.iter().all(|e| e.performed_by == Some(moderator.id)));
    assert!(events.iter().all(|e| e.post_id == post.id));
    assert_eq!(events[3].metadata["title"], serde_json::json!("Hello"));
}

#[tokio::test]
async fn deleted_parents_leave_children_at_the_top_level() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, general.id, "Hello").await.unwrap();

    let parent = t
        .forum
        .replies
        .create(&author, draft(post.id, "parent", None))
        .await
        .unwrap();
    let child = t
        .forum
        .replies
        .create(&author, draft(post.id, "child", Some(parent.id)))
        .await
        .unwrap();

    let tree = t.forum.replies.thread(None, post.id).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].children[0].reply.reply.id, child.id);

    t.forum.moderation.delete_reply(&author, parent.id).await.unwrap();

    let tree = t.forum.replies.thread(None, post.id).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].reply.reply.id, child.id);
    assert_eq!(tree[0].reply.reply.parent_id, Some(parent.id));
}

#[tokio::test]
async fn reply_parent_must_belong_to_the_same_thread() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let first = t.post(&author, general.id, "First").await.unwrap();
    let second = t.post(&author, general.id, "Second").await.unwrap();
    let elsewhere = t
        .forum
        .replies
        .create(&author, draft(first.id, "over here", None))
        .await
        .unwrap();

    let err = t
        .forum
        .replies
        .create(&author, draft(second.id, "nested", Some(elsewhere.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn recent_activity_hides_restricted_categories() {
    let t = TestForum::new();
    let investor = user(Role::Investor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let vip = t.category("vip-lounge", VisibilityTier::Vip).await.unwrap();
    let open = t.post(&investor, general.id, "Open thread").await.unwrap();
    let closed = t.post(&investor, vip.id, "Private thread").await.unwrap();
    t.forum
        .replies
        .create(&investor, draft(closed.id, "vip only", None))
        .await
        .unwrap();

    let public_view = t
        .forum
        .posts
        .recent_by_user(None, investor.id, None)
        .await
        .unwrap();
    assert_eq!(public_view.len(), 1);
    assert_eq!(public_view[0].id, open.id);
    assert!(t
        .forum
        .replies
        .recent_by_user(None, investor.id, None)
        .await
        .unwrap()
        .is_empty());

    let own_view = t
        .forum
        .posts
        .recent_by_user(Some(&investor), investor.id, Some(10))
        .await
        .unwrap();
    assert_eq!(own_view.len(), 2);
    let replies = t
        .forum
        .replies
        .recent_by_user(Some(&investor), investor.id, None)
        .await
        .unwrap();
    assert_eq!(replies[0].post_title, "Private thread");
}

#[tokio::test]
async fn duplicate_slugs_are_rejected() {
    let t = TestForum::new();
    t.category("general", VisibilityTier::Public).await.unwrap();
    let err = t.category("general", VisibilityTier::Actor).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn older_public_posts_are_not_crowded_out_by_gated_ones() {
    let t = TestForum::new();
    let investor = user(Role::Investor);
    let general = t.category("general", VisibilityTier::Public).await.unwrap();
    let vip = t.category("vip-lounge", VisibilityTier::Vip).await.unwrap();

    let open = t.post(&investor, general.id, "Open thread").await.unwrap();
    t.forum
        .replies
        .create(&investor, draft(open.id, "public note", None))
        .await
        .unwrap();
    for n in 0..6 {
        tokio::time::sleep(Duration::from_millis(1)).await;
        let gated = t
            .post(&investor, vip.id, &format!("Deal memo {n}"))
            .await
            .unwrap();
        t.forum
            .replies
            .create(&investor, draft(gated.id, "vip note", None))
            .await
            .unwrap();
    }

    let posts = t
        .forum
        .posts
        .recent_by_user(None, investor.id, None)
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, open.id);

    let replies = t
        .forum
        .replies
        .recent_by_user(None, investor.id, None)
        .await
        .unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].reply.post_id, open.id);
}

#[tokio::test]
async fn admins_still_see_recent_posts_in_deactivated_categories() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let archive = t.category("archive", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, archive.id, "Old audition notes").await.unwrap();
    t.forum
        .categories
        .update(
            &admin(),
            archive.id,
            CategoryPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(t
        .forum
        .posts
        .recent_by_user(Some(&author), author.id, None)
        .await
        .unwrap()
        .is_empty());
    let seen_by_admin = t
        .forum
        .posts
        .recent_by_user(Some(&admin()), author.id, None)
        .await
        .unwrap();
    assert_eq!(seen_by_admin[0].id, post.id);
}

#[tokio::test]
async fn deactivating_a_category_closes_its_threads_to_members() {
    let t = TestForum::new();
    let author = user(Role::Actor);
    let archive = t.category("archive", VisibilityTier::Public).await.unwrap();
    let post = t.post(&author, archive.id, "Last call").await.unwrap();
    let reply = t
        .forum
        .replies
        .create(&author, draft(post.id, "see you", None))
        .await
        .unwrap();
    t.forum
        .categories
        .update(
            &admin(),
            archive.id,
            CategoryPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let hidden = |err: DomainError| matches!(err, DomainError::NotFound { .. });
    assert!(hidden(
        t.forum.posts.list_by_category(Some(&author), archive.id).await.unwrap_err()
    ));
    assert!(hidden(t.forum.posts.view(Some(&author), post.id).await.unwrap_err()));
    assert!(hidden(t.forum.replies.list(None, post.id).await.unwrap_err()));
    assert!(hidden(t.forum.replies.get(Some(&author), reply.id).await.unwrap_err()));
    assert!(hidden(
        t.forum
            .replies
            .create(&author, draft(post.id, "anyone?", None))
            .await
            .unwrap_err()
    ));
    assert!(hidden(t.post(&author, archive.id, "Reopen").await.unwrap_err()));

    let moderator = admin();
    assert!(t.forum.posts.view(Some(&moderator), post.id).await.is_ok());
    t.forum
        .replies
        .create(&moderator, draft(post.id, "Archived.", None))
        .await
        .unwrap();
}

