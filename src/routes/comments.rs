use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;

use crate::comments::{CommentPage, PageRequest};
use crate::db::models::Comment;
use crate::envelope::Envelope;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody, PathId, QueryParams};
use crate::state::AppState;
use crate::validation::{self, Violations};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(add_comment))
        .route("/comments/{id}", patch(update_comment).delete(delete_comment))
        .route("/comments/{id}/posts", get(list_comments))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub post_id: i64,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    pub parent_id: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl CommentQuery {
    /// Anything that is not a positive id means top level.
    fn parent_id(&self) -> Option<i64> {
        self.parent_id
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
    }
}

/// POST /comments
async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    JsonBody(body): JsonBody<AddCommentRequest>,
) -> AppResult<Envelope<Comment>> {
    let mut v = Violations::new();
    v.check(validation::not_blank(&body.text), "text must not be empty")
        .check(body.post_id > 0, "postId must be a positive integer");
    v.finish()?;

    let comment = state
        .comments
        .add_comment(body.post_id, actor.id, body.parent_id, &body.text)
        .await?;
    Ok(Envelope::created("Comment added successfully.", comment))
}

/// PATCH /comments/{id}
async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    PathId(id): PathId,
    JsonBody(body): JsonBody<UpdateCommentRequest>,
) -> AppResult<Envelope<Comment>> {
    let mut v = Violations::new();
    v.check(validation::not_blank(&body.text), "text must not be empty");
    v.finish()?;

    let comment = state
        .comments
        .update_comment(id, actor.id, &body.text)
        .await?;
    Ok(Envelope::ok("Comment updated successfully.", comment))
}

/// DELETE /comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    PathId(id): PathId,
) -> AppResult<Envelope<Comment>> {
    let comment = state
        .comments
        .delete_comment(id, actor.id, actor.role)
        .await?;
    Ok(Envelope::ok("Comment deleted successfully.", comment))
}

/// GET /comments/{post_id}/posts?parentId=&page=&perPage=
/// One level of a post's comment tree.
async fn list_comments(
    State(state): State<AppState>,
    PathId(post_id): PathId,
    QueryParams(query): QueryParams<CommentQuery>,
) -> AppResult<Envelope<CommentPage>> {
    let request = PageRequest::new(
        validation::positive_or(query.page.as_deref(), 1),
        validation::positive_or(
            query.per_page.as_deref(),
            state.config.pagination.comments_per_page,
        ),
    );

    let page = state
        .comments
        .get_comments_for_post(post_id, query.parent_id(), request)
        .await?;
    Ok(Envelope::ok("Comments fetched successfully", page))
}
