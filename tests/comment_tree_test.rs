//! Comment trees: pagination, level-by-level traversal, and delete rights

mod common;

use common::{actor, setup};
use quill::comments::{CommentError, PageRequest};
use quill::db::models::Role;
use quill::posts::CreatePostInput;
use quill::state::AppState;

async fn public_post(state: &AppState, author_id: i64) -> i64 {
    state
        .posts
        .create_post(
            CreatePostInput {
                title: "Hello".into(),
                body: "World".into(),
                image_url: None,
                is_draft: Some(false),
                is_private: Some(false),
                category_id: None,
            },
            author_id,
        )
        .await
        .unwrap()
        .id
}

// ============================================================================
// PAGINATION
// ============================================================================

#[tokio::test]
async fn test_seven_comments_paged_by_five() {
    let app = setup();
    let author = actor(&app.state, "author", Role::User).await;
    let post_id = public_post(&app.state, author.id).await;
    for i in 0..7 {
        app.state
            .comments
            .add_comment(post_id, author.id, None, &format!("comment {i}"))
            .await
            .unwrap();
    }

    let comments = &app.state.comments;
    let page1 = comments
        .get_comments_for_post(post_id, None, PageRequest::new(1, 5))
        .await
        .unwrap();
    assert_eq!(page1.comments.len(), 5);
    assert_eq!(page1.total_comments_count, 7);
    assert_eq!(page1.remaining_comments_count, 2);
    assert_eq!(page1.page_number, 1);
    assert_eq!(page1.page_size, 5);

    let page2 = comments
        .get_comments_for_post(post_id, None, PageRequest::new(2, 5))
        .await
        .unwrap();
    assert_eq!(page2.comments.len(), 2);
    assert_eq!(page2.remaining_comments_count, 0);

    let page3 = comments
        .get_comments_for_post(post_id, None, PageRequest::new(3, 5))
        .await
        .unwrap();
    assert!(page3.comments.is_empty());
    assert_eq!(page3.total_comments_count, 7);
    assert_eq!(page3.remaining_comments_count, 0);
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let app = setup();
    let author = actor(&app.state, "author", Role::User).await;
    let post_id = public_post(&app.state, author.id).await;
    for i in 0..3 {
        app.state
            .comments
            .add_comment(post_id, author.id, None, &format!("comment {i}"))
            .await
            .unwrap();
    }

    let page = app
        .state
        .comments
        .get_comments_for_post(post_id, None, PageRequest::new(i64::MAX, 5))
        .await
        .unwrap();
    assert!(page.comments.is_empty());
    assert_eq!(page.total_comments_count, 3);
    assert_eq!(page.remaining_comments_count, 0);
    assert_eq!(page.page_number, i64::MAX);
}

#[tokio::test]
async fn test_newest_comments_come_first() {
    let app = setup();
    let author = actor(&app.state, "author", Role::User).await;
    let post_id = public_post(&app.state, author.id).await;
    let mut ids = Vec::new();
    for i in 0..4 {
        let comment = app
            .state
            .comments
            .add_comment(post_id, author.id, None, &format!("comment {i}"))
            .await
            .unwrap();
        ids.push(comment.id);
    }

    let page = app
        .state
        .comments
        .get_comments_for_post(post_id, None, PageRequest::new(1, 10))
        .await
        .unwrap();
    let listed: Vec<i64> = page.comments.iter().map(|n| n.comment.id).collect();
    ids.reverse();
    assert_eq!(listed, ids);
}

// ============================================================================
// TREE TRAVERSAL
// ============================================================================

#[tokio::test]
async fn test_drilling_into_a_comment_returns_only_its_children() {
    let app = setup();
    let author = actor(&app.state, "author", Role::User).await;
    let comments = &app.state.comments;
    let post_id = public_post(&app.state, author.id).await;
    let other_post = public_post(&app.state, author.id).await;

    let root_a = comments
        .add_comment(post_id, author.id, None, "a")
        .await
        .unwrap();
    let root_b = comments
        .add_comment(post_id, author.id, None, "b")
        .await
        .unwrap();
    for text in ["a1", "a2", "a3"] {
        comments
            .add_comment(post_id, author.id, Some(root_a.id), text)
            .await
            .unwrap();
    }
    comments
        .add_comment(post_id, author.id, Some(root_b.id), "b1")
        .await
        .unwrap();
    comments
        .add_comment(other_post, author.id, None, "elsewhere")
        .await
        .unwrap();

    let top = comments
        .get_comments_for_post(post_id, None, PageRequest::new(1, 5))
        .await
        .unwrap();
    assert_eq!(top.total_comments_count, 2);

    for node in &top.comments {
        let children = comments
            .get_comments_for_post(post_id, Some(node.comment.id), PageRequest::new(1, 5))
            .await
            .unwrap();
        assert_eq!(children.total_comments_count, node.child_count);
        assert!(node.has_child);
        assert!(children
            .comments
            .iter()
            .all(|child| child.comment.parent_id == Some(node.comment.id)
                && child.comment.post_id == post_id));
    }

    let a = top
        .comments
        .iter()
        .find(|n| n.comment.id == root_a.id)
        .unwrap();
    assert_eq!(a.child_count, 3);
}

#[tokio::test]
async fn test_leaf_comment_has_no_children() {
    let app = setup();
    let author = actor(&app.state, "author", Role::User).await;
    let post_id = public_post(&app.state, author.id).await;
    app.state
        .comments
        .add_comment(post_id, author.id, None, "lonely")
        .await
        .unwrap();

    let page = app
        .state
        .comments
        .get_comments_for_post(post_id, None, PageRequest::new(1, 5))
        .await
        .unwrap();
    assert_eq!(page.comments[0].child_count, 0);
    assert!(!page.comments[0].has_child);
}

#[tokio::test]
async fn test_reply_to_parent_on_other_post_is_rejected() {
    let app = setup();
    let author = actor(&app.state, "author", Role::User).await;
    let first = public_post(&app.state, author.id).await;
    let second = public_post(&app.state, author.id).await;
    let parent = app
        .state
        .comments
        .add_comment(first, author.id, None, "root")
        .await
        .unwrap();

    let result = app
        .state
        .comments
        .add_comment(second, author.id, Some(parent.id), "stray")
        .await;
    assert!(matches!(result, Err(CommentError::ParentOnOtherPost)));
}

// ============================================================================
// DELETE RIGHTS
// ============================================================================

#[tokio::test]
async fn test_post_author_can_delete_but_stranger_cannot() {
    let app = setup();
    let a = actor(&app.state, "alice", Role::Admin).await;
    let b = actor(&app.state, "bob", Role::User).await;
    let d = actor(&app.state, "dave", Role::User).await;
    let post_id = public_post(&app.state, a.id).await;

    let by_b = app
        .state
        .comments
        .add_comment(post_id, b.id, None, "nice post")
        .await
        .unwrap();
    let denied = app
        .state
        .comments
        .delete_comment(by_b.id, d.id, d.role)
        .await;
    assert!(matches!(denied, Err(CommentError::DeleteForbidden)));

    app.state
        .comments
        .delete_comment(by_b.id, a.id, Role::User)
        .await
        .unwrap();

    let another = app
        .state
        .comments
        .add_comment(post_id, b.id, None, "second thought")
        .await
        .unwrap();
    let denied = app
        .state
        .comments
        .delete_comment(another.id, d.id, d.role)
        .await;
    assert!(matches!(denied, Err(CommentError::DeleteForbidden)));
}

#[tokio::test]
async fn test_admin_and_comment_author_can_delete() {
    let app = setup();
    let owner = actor(&app.state, "owner", Role::User).await;
    let writer = actor(&app.state, "writer", Role::User).await;
    let admin = actor(&app.state, "admin", Role::Admin).await;
    let post_id = public_post(&app.state, owner.id).await;
    let comments = &app.state.comments;

    let first = comments
        .add_comment(post_id, writer.id, None, "one")
        .await
        .unwrap();
    let second = comments
        .add_comment(post_id, writer.id, None, "two")
        .await
        .unwrap();

    comments
        .delete_comment(first.id, admin.id, admin.role)
        .await
        .unwrap();
    comments
        .delete_comment(second.id, writer.id, writer.role)
        .await
        .unwrap();
    assert!(matches!(
        comments.delete_comment(second.id, writer.id, writer.role).await,
        Err(CommentError::NotFound)
    ));
}

#[tokio::test]
async fn test_deleting_post_removes_its_comments() {
    let app = setup();
    let author = actor(&app.state, "author", Role::User).await;
    let post_id = public_post(&app.state, author.id).await;
    let comment = app
        .state
        .comments
        .add_comment(post_id, author.id, None, "bye")
        .await
        .unwrap();

    app.state
        .posts
        .delete_post(post_id, author.id, author.role)
        .await
        .unwrap();
    let result = app
        .state
        .comments
        .update_comment(comment.id, author.id, "still here?")
        .await;
    assert!(matches!(result, Err(CommentError::NotFound)));
}
