use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::Post;
use crate::envelope::Envelope;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody, MaybeUser, PathId, QueryParams};
use crate::posts::{CreatePostInput, PostDetails, PostPatch, PostView};
use crate::state::AppState;
use crate::validation::{self, Violations};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub skip: Option<String>,
    pub take: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub image_url: Option<String>,
    pub is_draft: Option<bool>,
    pub is_private: Option<bool>,
    pub category_id: Option<i64>,
}

/// The listing keeps its counters beside `data` rather than inside it.
#[derive(Serialize)]
struct PostListBody {
    status: u16,
    response: &'static str,
    data: Vec<PostView>,
    #[serde(rename = "totalPostsCount")]
    total_posts_count: i64,
    #[serde(rename = "CurrentPostsCount")]
    current_posts_count: usize,
}

/// GET /posts?skip=&take=
async fn list_posts(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> AppResult<Response> {
    let skip = validation::non_negative_or(query.skip.as_deref(), 0);
    let take = validation::positive_or(
        query.take.as_deref(),
        state.config.pagination.posts_per_page,
    );

    let listing = state.posts.list_public_posts(skip, take).await?;
    let body = PostListBody {
        status: StatusCode::OK.as_u16(),
        response: "Posts Fetched Successfully",
        data: listing.posts,
        total_posts_count: listing.total_posts_count,
        current_posts_count: listing.current_posts_count,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// POST /posts
async fn create_post(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    JsonBody(body): JsonBody<CreatePostRequest>,
) -> AppResult<Envelope<Post>> {
    let mut v = Violations::new();
    v.check(validation::not_blank(&body.title), "title must not be empty")
        .check(validation::not_blank(&body.body), "body must not be empty");
    v.finish()?;

    if let Some(category_id) = body.category_id {
        state.categories.get(category_id).await?;
    }

    let post = state
        .posts
        .create_post(
            CreatePostInput {
                title: body.title,
                body: body.body,
                image_url: body.image_url,
                is_draft: body.is_draft,
                is_private: body.is_private,
                category_id: body.category_id,
            },
            actor.id,
        )
        .await?;
    Ok(Envelope::created("Post Created Successfully", post))
}

/// GET /posts/{id}
/// Anonymous callers only see public posts.
async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathId(id): PathId,
) -> AppResult<Envelope<PostDetails>> {
    let details = state.posts.view_post(id, viewer.id()).await?;
    Ok(Envelope::ok("Post Fetched Successfully", details))
}

/// PATCH /posts/{id}
async fn update_post(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    PathId(id): PathId,
    JsonBody(patch): JsonBody<PostPatch>,
) -> AppResult<Envelope<Post>> {
    let mut v = Violations::new();
    v.check(
        patch.title.as_deref().map_or(true, validation::not_blank),
        "title must not be empty",
    )
    .check(
        patch.body.as_deref().map_or(true, validation::not_blank),
        "body must not be empty",
    );
    v.finish()?;

    if let Some(Some(category_id)) = patch.category_id {
        state.categories.get(category_id).await?;
    }

    let post = state.posts.update_post(id, &patch, actor.id).await?;
    Ok(Envelope::ok("Post Updated Successfully", post))
}

/// DELETE /posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    PathId(id): PathId,
) -> AppResult<Envelope<Post>> {
    let post = state.posts.delete_post(id, actor.id, actor.role).await?;
    Ok(Envelope::ok("Post deleted Successfully", post))
}
