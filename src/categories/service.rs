use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use super::repository::{CategoryRepository, NewCategory};
use crate::auth::Actor;
use crate::db::models::Category;
use crate::db::{now, RepositoryError};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Not Allowed")]
    AdminOnly,

    #[error("Category already exist")]
    Duplicate,

    #[error("Category Not Found.")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] RepositoryError),
}

impl CategoryError {
    /// A unique-name violation on write means another request took the name first.
    fn from_write(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict => CategoryError::Duplicate,
            other => CategoryError::Internal(other),
        }
    }
}

impl From<CategoryError> for AppError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::AdminOnly => AppError::Forbidden(err.to_string()),
            CategoryError::Duplicate => AppError::BadRequest(err.to_string()),
            CategoryError::NotFound => AppError::NotFound(err.to_string()),
            CategoryError::Internal(e) => AppError::Database(e),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }

    fn require_admin(actor: &Actor) -> Result<(), CategoryError> {
        if actor.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = actor.id, "Category change denied: not an admin");
            Err(CategoryError::AdminOnly)
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<String>,
    ) -> Result<Category, CategoryError> {
        let name = name.trim();
        // Duplicates are reported before the role check.
        if self.categories.find_by_name(name).await?.is_some() {
            return Err(CategoryError::Duplicate);
        }
        Self::require_admin(actor)?;

        let category = self
            .categories
            .insert(NewCategory {
                name: name.to_owned(),
                description,
                created_by_id: actor.id,
                created_at: now(),
            })
            .await
            .map_err(CategoryError::from_write)?;
        tracing::info!(category_id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn list(&self) -> Result<Vec<Category>, CategoryError> {
        Ok(self.categories.list().await?)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryError> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or(CategoryError::NotFound)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: i64,
        patch: &CategoryPatch,
    ) -> Result<Category, CategoryError> {
        Self::require_admin(actor)?;
        let mut category = self.get(id).await?;

        if let Some(name) = patch.name.as_deref().map(str::trim) {
            // Renaming to a different casing of itself is fine.
            if let Some(existing) = self.categories.find_by_name(name).await? {
                if existing.id != id {
                    return Err(CategoryError::Duplicate);
                }
            }
            category.name = name.to_owned();
        }
        if let Some(description) = &patch.description {
            category.description = Some(description.clone());
        }
        category.updated_by_id = Some(actor.id);
        category.updated_at = now();

        self.categories
            .save(&category)
            .await
            .map_err(CategoryError::from_write)?;
        Ok(category)
    }

    /// Posts in the category survive with no category.
    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<Category, CategoryError> {
        Self::require_admin(actor)?;
        let category = self.get(id).await?;
        self.categories.delete(id).await?;
        tracing::info!(category_id = id, "Category deleted");
        Ok(category)
    }
}
