//! Post visibility, partial updates, listings and categories

mod common;

use common::{actor, setup};
use quill::categories::CategoryError;
use quill::db::models::Role;
use quill::posts::{CreatePostInput, PostError, PostPatch};

fn draft(title: &str) -> CreatePostInput {
    CreatePostInput {
        title: title.into(),
        body: "body".into(),
        image_url: None,
        is_draft: None,
        is_private: None,
        category_id: None,
    }
}

fn published(title: &str) -> CreatePostInput {
    CreatePostInput {
        is_draft: Some(false),
        ..draft(title)
    }
}

// ============================================================================
// SCENARIO
// ============================================================================

#[tokio::test]
async fn test_category_case_clash_and_hidden_draft() {
    let app = setup();
    let a = actor(&app.state, "alice", Role::Admin).await;
    let b = actor(&app.state, "bob", Role::User).await;
    let c = actor(&app.state, "carol", Role::User).await;

    app.state.categories.create(&a, "Tech", None).await.unwrap();
    let dup = app.state.categories.create(&b, "tech", None).await;
    assert!(matches!(dup, Err(CategoryError::Duplicate)));
    let not_admin = app.state.categories.create(&b, "Food", None).await;
    assert!(matches!(not_admin, Err(CategoryError::AdminOnly)));

    let post = app
        .state
        .posts
        .create_post(draft("secret plans"), b.id)
        .await
        .unwrap();
    assert!(post.is_draft);
    assert!(!post.is_private);
    assert_eq!(post.updated_by, b.id);

    assert!(matches!(
        app.state.posts.get_post(post.id, Some(c.id)).await,
        Err(PostError::AccessDenied)
    ));
    assert!(matches!(
        app.state.posts.get_post(post.id, None).await,
        Err(PostError::NotFound)
    ));
    let own = app.state.posts.get_post(post.id, Some(b.id)).await.unwrap();
    assert_eq!(own.user.user_name, "bob");
}

// ============================================================================
// VISIBILITY
// ============================================================================

#[tokio::test]
async fn test_private_post_visible_only_to_author() {
    let app = setup();
    let owner = actor(&app.state, "owner", Role::User).await;
    let admin = actor(&app.state, "admin", Role::Admin).await;
    let post = app
        .state
        .posts
        .create_post(
            CreatePostInput {
                is_private: Some(true),
                ..published("diary")
            },
            owner.id,
        )
        .await
        .unwrap();

    assert!(app.state.posts.get_post(post.id, Some(owner.id)).await.is_ok());
    assert!(matches!(
        app.state.posts.get_post(post.id, Some(admin.id)).await,
        Err(PostError::AccessDenied)
    ));
    assert!(matches!(
        app.state.posts.get_post(post.id, None).await,
        Err(PostError::NotFound)
    ));
}

#[tokio::test]
async fn test_public_post_view_includes_projections_and_comments() {
    let app = setup();
    let admin = actor(&app.state, "admin", Role::Admin).await;
    let reader = actor(&app.state, "reader", Role::User).await;
    let tech = app.state.categories.create(&admin, "Tech", None).await.unwrap();

    let post = app
        .state
        .posts
        .create_post(
            CreatePostInput {
                category_id: Some(tech.id),
                ..published("launch")
            },
            admin.id,
        )
        .await
        .unwrap();
    for i in 0..6 {
        app.state
            .comments
            .add_comment(post.id, reader.id, None, &format!("c{i}"))
            .await
            .unwrap();
    }

    let details = app.state.posts.view_post(post.id, None).await.unwrap();
    assert_eq!(details.view.user.id, admin.id);
    assert_eq!(details.view.user.role, Role::Admin);
    assert_eq!(details.view.category.as_ref().unwrap().name, "Tech");
    assert_eq!(details.comments.comments.len(), 5);
    assert_eq!(details.comments.total_comments_count, 6);
    assert_eq!(details.comments.remaining_comments_count, 1);
}

#[tokio::test]
async fn test_missing_post_is_not_found() {
    let app = setup();
    let user = actor(&app.state, "user", Role::User).await;
    assert!(matches!(
        app.state.posts.get_post(404, Some(user.id)).await,
        Err(PostError::NotFound)
    ));
}

// ============================================================================
// UPDATE / DELETE
// ============================================================================

#[tokio::test]
async fn test_update_can_unset_private_and_clear_image() {
    let app = setup();
    let owner = actor(&app.state, "owner", Role::User).await;
    let post = app
        .state
        .posts
        .create_post(
            CreatePostInput {
                image_url: Some("https://example.com/a.png".into()),
                is_private: Some(true),
                ..published("pic")
            },
            owner.id,
        )
        .await
        .unwrap();

    let patch = PostPatch {
        image_url: Some(None),
        is_private: Some(false),
        ..PostPatch::default()
    };
    let updated = app
        .state
        .posts
        .update_post(post.id, &patch, owner.id)
        .await
        .unwrap();
    assert!(!updated.is_private);
    assert_eq!(updated.image_url, None);
    assert_eq!(updated.title, "pic");

    // Now public.
    assert!(app.state.posts.get_post(post.id, None).await.is_ok());
}

#[tokio::test]
async fn test_only_author_updates_post() {
    let app = setup();
    let owner = actor(&app.state, "owner", Role::User).await;
    let admin = actor(&app.state, "admin", Role::Admin).await;
    let post = app
        .state
        .posts
        .create_post(published("mine"), owner.id)
        .await
        .unwrap();

    let patch = PostPatch {
        title: Some("theirs".into()),
        ..PostPatch::default()
    };
    assert!(matches!(
        app.state.posts.update_post(post.id, &patch, admin.id).await,
        Err(PostError::NotAuthor)
    ));
    assert!(matches!(
        app.state.posts.update_post(9999, &patch, owner.id).await,
        Err(PostError::NotFound)
    ));
}

#[tokio::test]
async fn test_delete_by_author_or_admin_only() {
    let app = setup();
    let owner = actor(&app.state, "owner", Role::User).await;
    let other = actor(&app.state, "other", Role::User).await;
    let admin = actor(&app.state, "admin", Role::Admin).await;
    let posts = &app.state.posts;

    let first = posts.create_post(published("one"), owner.id).await.unwrap();
    let second = posts.create_post(published("two"), owner.id).await.unwrap();

    assert!(matches!(
        posts.delete_post(first.id, other.id, other.role).await,
        Err(PostError::NotAuthor)
    ));
    posts.delete_post(first.id, admin.id, admin.role).await.unwrap();
    posts.delete_post(second.id, owner.id, owner.role).await.unwrap();
    assert!(matches!(
        posts.delete_post(second.id, owner.id, owner.role).await,
        Err(PostError::NotFound)
    ));
}

// ============================================================================
// LISTING
// ============================================================================

#[tokio::test]
async fn test_listing_shows_only_public_posts() {
    let app = setup();
    let owner = actor(&app.state, "owner", Role::User).await;
    let posts = &app.state.posts;

    for i in 0..4 {
        posts
            .create_post(published(&format!("public {i}")), owner.id)
            .await
            .unwrap();
    }
    posts.create_post(draft("draft"), owner.id).await.unwrap();
    posts
        .create_post(
            CreatePostInput {
                is_private: Some(true),
                ..published("private")
            },
            owner.id,
        )
        .await
        .unwrap();

    let all = posts.list_public_posts(0, 10).await.unwrap();
    assert_eq!(all.total_posts_count, 4);
    assert_eq!(all.current_posts_count, 4);
    assert!(all.posts.iter().all(|v| v.post.is_public()));

    let window = posts.list_public_posts(3, 10).await.unwrap();
    assert_eq!(window.total_posts_count, 4);
    assert_eq!(window.current_posts_count, 1);
    assert_eq!(window.posts[0].post.title, "public 3");
}

#[tokio::test]
async fn test_deleting_category_keeps_posts() {
    let app = setup();
    let admin = actor(&app.state, "admin", Role::Admin).await;
    let tech = app.state.categories.create(&admin, "Tech", None).await.unwrap();
    let post = app
        .state
        .posts
        .create_post(
            CreatePostInput {
                category_id: Some(tech.id),
                ..published("gadget")
            },
            admin.id,
        )
        .await
        .unwrap();

    app.state.categories.delete(&admin, tech.id).await.unwrap();
    let view = app.state.posts.get_post(post.id, None).await.unwrap();
    assert!(view.category.is_none());
    assert_eq!(view.post.category_id, None);
}
