use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::repository::{NewPost, PostRepository, PostView};
use crate::comments::{CommentError, CommentPage, CommentService, PageRequest};
use crate::db::models::{Post, Role};
use crate::db::{now, RepositoryError};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum PostError {
    /// Also returned to anonymous callers for hidden posts.
    #[error("Post Not Found")]
    NotFound,

    #[error("Access Denied")]
    AccessDenied,

    #[error("Not Allowed")]
    NotAuthor,

    #[error(transparent)]
    Internal(#[from] RepositoryError),
}

impl From<CommentError> for PostError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::Internal(e) => PostError::Internal(e),
            _ => PostError::NotFound,
        }
    }
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::NotFound => AppError::NotFound(err.to_string()),
            PostError::AccessDenied | PostError::NotAuthor => AppError::Forbidden(err.to_string()),
            PostError::Internal(e) => AppError::Database(e),
        }
    }
}

/// Published and non-private posts are visible to everyone. Anything else is
/// visible only to its author; anonymous callers cannot tell it exists.
pub fn check_visibility(post: &Post, viewer: Option<i64>) -> Result<(), PostError> {
    if post.is_public() {
        return Ok(());
    }
    match viewer {
        None => Err(PostError::NotFound),
        Some(id) if id == post.user_id => Ok(()),
        Some(_) => Err(PostError::AccessDenied),
    }
}

pub struct CreatePostInput {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub is_draft: Option<bool>,
    pub is_private: Option<bool>,
    pub category_id: Option<i64>,
}

/// Partial update. A field is applied only when present in the request, so
/// `false`, empty strings, and explicit `null` are all real updates.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
    pub is_draft: Option<bool>,
    pub is_private: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<i64>>,
}

// Distinguishes `"field": null` (Some(None)) from an absent field (None).
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PostPatch {
    pub fn apply(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(body) = &self.body {
            post.body = body.clone();
        }
        if let Some(image_url) = &self.image_url {
            post.image_url = image_url.clone();
        }
        if let Some(is_draft) = self.is_draft {
            post.is_draft = is_draft;
        }
        if let Some(is_private) = self.is_private {
            post.is_private = is_private;
        }
        if let Some(category_id) = self.category_id {
            post.category_id = category_id;
        }
    }
}

/// A post as shown on its own page, with the first page of top-level comments.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub view: PostView,
    pub comments: CommentPage,
}

#[derive(Debug, Clone)]
pub struct PostListing {
    pub posts: Vec<PostView>,
    pub total_posts_count: i64,
    pub current_posts_count: usize,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<CommentService>,
    comments_per_page: i64,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<CommentService>,
        comments_per_page: i64,
    ) -> Self {
        Self {
            posts,
            comments,
            comments_per_page,
        }
    }

    pub async fn create_post(
        &self,
        input: CreatePostInput,
        author_id: i64,
    ) -> Result<Post, PostError> {
        let post = self
            .posts
            .insert(NewPost {
                title: input.title,
                body: input.body,
                image_url: input.image_url,
                is_draft: input.is_draft.unwrap_or(true),
                is_private: input.is_private.unwrap_or(false),
                user_id: author_id,
                category_id: input.category_id,
                created_at: now(),
            })
            .await?;
        tracing::info!(post_id = post.id, author_id, "Post created");
        Ok(post)
    }

    pub async fn get_post(&self, post_id: i64, viewer: Option<i64>) -> Result<PostView, PostError> {
        let view = self
            .posts
            .find_view(post_id)
            .await?
            .ok_or(PostError::NotFound)?;
        check_visibility(&view.post, viewer)?;
        Ok(view)
    }

    pub async fn view_post(
        &self,
        post_id: i64,
        viewer: Option<i64>,
    ) -> Result<PostDetails, PostError> {
        let view = self.get_post(post_id, viewer).await?;
        let comments = self
            .comments
            .get_comments_for_post(post_id, None, PageRequest::new(1, self.comments_per_page))
            .await?;
        Ok(PostDetails { view, comments })
    }

    pub async fn update_post(
        &self,
        post_id: i64,
        patch: &PostPatch,
        user_id: i64,
    ) -> Result<Post, PostError> {
        let mut post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound)?;
        if post.user_id != user_id {
            tracing::warn!(post_id, user_id, "Post update denied");
            return Err(PostError::NotAuthor);
        }

        patch.apply(&mut post);
        post.updated_by = user_id;
        post.updated_at = now();
        self.posts.save(&post).await?;
        Ok(post)
    }

    /// Allowed for the post's author or an admin. Comments go with the post.
    pub async fn delete_post(
        &self,
        post_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Post, PostError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound)?;
        if post.user_id != user_id && !role.is_admin() {
            tracing::warn!(post_id, user_id, "Post delete denied");
            return Err(PostError::NotAuthor);
        }

        self.posts.delete(post_id).await?;
        tracing::info!(post_id, user_id, "Post deleted");
        Ok(post)
    }

    pub async fn list_public_posts(&self, skip: i64, take: i64) -> Result<PostListing, PostError> {
        let posts = self.posts.list_public(skip, take).await?;
        let total_posts_count = self.posts.count_public().await?;
        Ok(PostListing {
            current_posts_count: posts.len(),
            posts,
            total_posts_count,
        })
    }
}
