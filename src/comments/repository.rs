use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::domain::CommentNode;
use crate::db::models::Comment;
use crate::db::RepositoryError;
use crate::state::DbPool;

const COMMENT_COLUMNS: &str =
    "c.id, c.text, c.post_id, c.user_id, c.parent_id, c.created_at, c.updated_at";

pub struct NewComment {
    pub text: String,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepositoryError>;

    async fn insert(&self, comment: NewComment) -> Result<Comment, RepositoryError>;

    async fn update_text(
        &self,
        id: i64,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Descendants go with it through the parent foreign key.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    /// One level of the tree: comments on `post_id` whose parent is exactly
    /// `parent_id` (top level when `None`), newest first, each with its
    /// direct child count.
    async fn page(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentNode>, RepositoryError>;

    async fn count(&self, post_id: i64, parent_id: Option<i64>) -> Result<i64, RepositoryError>;
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        text: row.get(1)?,
        post_id: row.get(2)?,
        user_id: row.get(3)?,
        parent_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub struct SqliteCommentRepository {
    pool: DbPool,
}

impl SqliteCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ?1");
        let comment = conn
            .query_row(&sql, params![id], comment_from_row)
            .optional()?;
        Ok(comment)
    }

    async fn insert(&self, comment: NewComment) -> Result<Comment, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (text, post_id, user_id, parent_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                comment.text,
                comment.post_id,
                comment.user_id,
                comment.parent_id,
                comment.created_at,
            ],
        )?;

        Ok(Comment {
            id: conn.last_insert_rowid(),
            text: comment.text,
            post_id: comment.post_id,
            user_id: comment.user_id,
            parent_id: comment.parent_id,
            created_at: comment.created_at,
            updated_at: comment.created_at,
        })
    }

    async fn update_text(
        &self,
        id: i64,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE comments SET text = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, text, at],
        )?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn page(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentNode>, RepositoryError> {
        let conn = self.pool.get()?;
        // `IS` matches NULL to NULL, so one statement covers both tree levels.
        let sql = format!(
            "SELECT {COMMENT_COLUMNS}, COUNT(ch.id)
             FROM comments c
             LEFT JOIN comments ch ON ch.parent_id = c.id
             WHERE c.post_id = ?1 AND c.parent_id IS ?2
             GROUP BY c.id
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT ?3 OFFSET ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let nodes = stmt
            .query_map(params![post_id, parent_id, limit, offset], |row| {
                let child_count: i64 = row.get(7)?;
                Ok(CommentNode::new(comment_from_row(row)?, child_count))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    async fn count(&self, post_id: i64, parent_id: Option<i64>) -> Result<i64, RepositoryError> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1 AND parent_id IS ?2",
            params![post_id, parent_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
