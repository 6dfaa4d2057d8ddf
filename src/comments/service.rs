use std::sync::Arc;

use thiserror::Error;

use super::domain::{CommentPage, PageRequest};
use super::repository::{CommentRepository, NewComment};
use crate::db::models::{Comment, Role};
use crate::db::{now, RepositoryError};
use crate::error::AppError;
use crate::posts::PostRepository;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("Parent comment not found.")]
    ParentNotFound,

    #[error("Parent comment does not belong to the provided post.")]
    ParentOnOtherPost,

    #[error("Post not found.")]
    PostNotFound,

    #[error("Cannot comment on a draft post.")]
    DraftPost,

    #[error("Only the author can comment on a private post.")]
    PrivatePost,

    #[error("Comment not found.")]
    NotFound,

    #[error("You are not authorized to update this comment.")]
    UpdateForbidden,

    #[error("You are not authorized to delete this comment.")]
    DeleteForbidden,

    #[error(transparent)]
    Internal(#[from] RepositoryError),
}

impl From<CommentError> for AppError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::ParentNotFound | CommentError::PostNotFound | CommentError::NotFound => {
                AppError::NotFound(err.to_string())
            }
            CommentError::ParentOnOtherPost | CommentError::DraftPost => {
                AppError::BadRequest(err.to_string())
            }
            CommentError::PrivatePost
            | CommentError::UpdateForbidden
            | CommentError::DeleteForbidden => AppError::Forbidden(err.to_string()),
            CommentError::Internal(e) => AppError::Database(e),
        }
    }
}

/// Comment trees hanging off posts. Clients walk a tree one level at a time
/// through [`CommentService::get_comments_for_post`].
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        text: &str,
    ) -> Result<Comment, CommentError> {
        if let Some(parent_id) = parent_id {
            let parent = self
                .comments
                .find_by_id(parent_id)
                .await?
                .ok_or(CommentError::ParentNotFound)?;
            if parent.post_id != post_id {
                return Err(CommentError::ParentOnOtherPost);
            }
        }

        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(CommentError::PostNotFound)?;
        if post.is_draft {
            return Err(CommentError::DraftPost);
        }
        if post.is_private && post.user_id != user_id {
            tracing::warn!(post_id, user_id, "Comment rejected on private post");
            return Err(CommentError::PrivatePost);
        }

        let comment = self
            .comments
            .insert(NewComment {
                text: text.to_owned(),
                post_id,
                user_id,
                parent_id,
                created_at: now(),
            })
            .await?;
        tracing::debug!(comment_id = comment.id, post_id, "Comment added");
        Ok(comment)
    }

    /// Only the text is mutable, and only by the comment's author.
    pub async fn update_comment(
        &self,
        comment_id: i64,
        user_id: i64,
        text: &str,
    ) -> Result<Comment, CommentError> {
        let mut comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or(CommentError::NotFound)?;
        if comment.user_id != user_id {
            return Err(CommentError::UpdateForbidden);
        }

        let at = now();
        self.comments.update_text(comment_id, text, at).await?;
        comment.text = text.to_owned();
        comment.updated_at = at;
        Ok(comment)
    }

    /// Allowed for the comment's author, the post's author, or an admin.
    pub async fn delete_comment(
        &self,
        comment_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Comment, CommentError> {
        let comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or(CommentError::NotFound)?;

        let allowed = comment.user_id == user_id
            || role.is_admin()
            || self
                .posts
                .find_by_id(comment.post_id)
                .await?
                .is_some_and(|post| post.user_id == user_id);
        if !allowed {
            tracing::warn!(comment_id, user_id, "Comment delete denied");
            return Err(CommentError::DeleteForbidden);
        }

        self.comments.delete(comment_id).await?;
        tracing::info!(comment_id, user_id, "Comment deleted");
        Ok(comment)
    }

    pub async fn get_comments_for_post(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        request: PageRequest,
    ) -> Result<CommentPage, CommentError> {
        let nodes = self
            .comments
            .page(post_id, parent_id, request.per_page, request.offset())
            .await?;
        let total = self.comments.count(post_id, parent_id).await?;
        Ok(CommentPage::assemble(nodes, total, request))
    }
}
