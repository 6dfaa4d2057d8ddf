use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::models::Category;
use crate::db::RepositoryError;
use crate::state::DbPool;

const CATEGORY_COLUMNS: &str =
    "id, name, description, created_by_id, updated_by_id, created_at, updated_at";

pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub created_by_id: i64,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepositoryError>;

    /// Case-insensitive.
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError>;

    async fn list(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn insert(&self, category: NewCategory) -> Result<Category, RepositoryError>;

    async fn save(&self, category: &Category) -> Result<(), RepositoryError>;

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by_id: row.get(3)?,
        updated_by_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub struct SqliteCategoryRepository {
    pool: DbPool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
        Ok(conn
            .query_row(&sql, params![id], category_from_row)
            .optional()?)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let conn = self.pool.get()?;
        // the column is declared COLLATE NOCASE
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?1");
        Ok(conn
            .query_row(&sql, params![name], category_from_row)
            .optional()?)
    }

    async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    async fn insert(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO categories (name, description, created_by_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                category.name,
                category.description,
                category.created_by_id,
                category.created_at
            ],
        )?;

        Ok(Category {
            id: conn.last_insert_rowid(),
            name: category.name,
            description: category.description,
            created_by_id: category.created_by_id,
            updated_by_id: None,
            created_at: category.created_at,
            updated_at: category.created_at,
        })
    }

    async fn save(&self, category: &Category) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE categories SET name = ?2, description = ?3, updated_by_id = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                category.id,
                category.name,
                category.description,
                category.updated_by_id,
                category.updated_at
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
