use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::categories::CategoryPatch;
use crate::db::models::Category;
use crate::envelope::Envelope;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody, PathId};
use crate::state::AppState;
use crate::validation::{self, Violations};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/category", get(list_categories).post(create_category))
        .route(
            "/category/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

/// POST /category (admin)
async fn create_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    JsonBody(body): JsonBody<CreateCategoryRequest>,
) -> AppResult<Envelope<Category>> {
    let mut v = Violations::new();
    v.check(validation::not_blank(&body.name), "name must not be empty");
    v.finish()?;

    let category = state
        .categories
        .create(&actor, &body.name, body.description)
        .await?;
    Ok(Envelope::created("Category Created Successfully", category))
}

/// GET /category
async fn list_categories(State(state): State<AppState>) -> AppResult<Envelope<Vec<Category>>> {
    let categories = state.categories.list().await?;
    Ok(Envelope::ok("Successfully fetched all categories", categories))
}

/// GET /category/{id}
async fn get_category(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> AppResult<Envelope<Category>> {
    let category = state.categories.get(id).await?;
    Ok(Envelope::ok("Category Fetched Successfully", category))
}

/// PATCH /category/{id} (admin)
async fn update_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    PathId(id): PathId,
    JsonBody(patch): JsonBody<CategoryPatch>,
) -> AppResult<Envelope<Category>> {
    let mut v = Violations::new();
    v.check(
        patch.name.as_deref().map_or(true, validation::not_blank),
        "name must not be empty",
    );
    v.finish()?;

    let category = state.categories.update(&actor, id, &patch).await?;
    Ok(Envelope::ok("Updated Category Successfully.", category))
}

/// DELETE /category/{id} (admin)
async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    PathId(id): PathId,
) -> AppResult<Envelope<Category>> {
    let category = state.categories.delete(&actor, id).await?;
    Ok(Envelope::ok("Deleted Successfully.", category))
}
