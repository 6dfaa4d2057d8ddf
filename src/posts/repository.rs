use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::models::{Post, Role};
use crate::db::RepositoryError;
use crate::state::DbPool;

const POST_COLUMNS: &str = "p.id, p.title, p.body, p.image_url, p.is_draft, p.is_private, \
     p.user_id, p.category_id, p.updated_by, p.created_at, p.updated_at";

const POST_WIDTH: usize = 11;

const VIEW_SELECT: &str = "u.id, u.user_name, u.email, u.role, c.id, c.name \
     FROM posts p \
     JOIN users u ON u.id = p.user_id \
     LEFT JOIN categories c ON c.id = p.category_id";

pub struct NewPost {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub is_draft: bool,
    pub is_private: bool,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Author columns projected alongside a post. Never the full user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub user: AuthorSummary,
    pub category: Option<CategorySummary>,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepositoryError>;

    /// The post with its author and category projections.
    async fn find_view(&self, id: i64) -> Result<Option<PostView>, RepositoryError>;

    async fn insert(&self, post: NewPost) -> Result<Post, RepositoryError>;

    /// Writes every mutable column of `post` back to its row.
    async fn save(&self, post: &Post) -> Result<(), RepositoryError>;

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    async fn list_public(&self, skip: i64, take: i64) -> Result<Vec<PostView>, RepositoryError>;

    async fn count_public(&self) -> Result<i64, RepositoryError>;
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        image_url: row.get(3)?,
        is_draft: row.get(4)?,
        is_private: row.get(5)?,
        user_id: row.get(6)?,
        category_id: row.get(7)?,
        updated_by: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn view_from_row(row: &Row<'_>) -> rusqlite::Result<PostView> {
    let at = POST_WIDTH;
    let category_id: Option<i64> = row.get(at + 4)?;
    let category = match category_id {
        Some(id) => Some(CategorySummary {
            id,
            name: row.get(at + 5)?,
        }),
        None => None,
    };

    Ok(PostView {
        post: post_from_row(row)?,
        user: AuthorSummary {
            id: row.get(at)?,
            user_name: row.get(at + 1)?,
            email: row.get(at + 2)?,
            role: row.get(at + 3)?,
        },
        category,
    })
}

pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1");
        let post = conn
            .query_row(&sql, params![id], post_from_row)
            .optional()?;
        Ok(post)
    }

    async fn find_view(&self, id: i64) -> Result<Option<PostView>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {POST_COLUMNS}, {VIEW_SELECT} WHERE p.id = ?1");
        let view = conn
            .query_row(&sql, params![id], view_from_row)
            .optional()?;
        Ok(view)
    }

    async fn insert(&self, post: NewPost) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (title, body, image_url, is_draft, is_private, user_id,
                                category_id, updated_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6, ?8, ?8)",
            params![
                post.title,
                post.body,
                post.image_url,
                post.is_draft,
                post.is_private,
                post.user_id,
                post.category_id,
                post.created_at,
            ],
        )?;

        Ok(Post {
            id: conn.last_insert_rowid(),
            title: post.title,
            body: post.body,
            image_url: post.image_url,
            is_draft: post.is_draft,
            is_private: post.is_private,
            user_id: post.user_id,
            category_id: post.category_id,
            updated_by: post.user_id,
            created_at: post.created_at,
            updated_at: post.created_at,
        })
    }

    async fn save(&self, post: &Post) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE posts SET title = ?2, body = ?3, image_url = ?4, is_draft = ?5,
                    is_private = ?6, category_id = ?7, updated_by = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                post.id,
                post.title,
                post.body,
                post.image_url,
                post.is_draft,
                post.is_private,
                post.category_id,
                post.updated_by,
                post.updated_at,
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn list_public(&self, skip: i64, take: i64) -> Result<Vec<PostView>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {POST_COLUMNS}, {VIEW_SELECT}
             WHERE p.is_draft = 0 AND p.is_private = 0
             ORDER BY p.id
             LIMIT ?1 OFFSET ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let views = stmt
            .query_map(params![take, skip], view_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(views)
    }

    async fn count_public(&self) -> Result<i64, RepositoryError> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE is_draft = 0 AND is_private = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
