// Persistence for users and refresh tokens
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::models::{RefreshToken, Role, User};
use crate::db::RepositoryError;
use crate::state::DbPool;

const USER_COLUMNS: &str = "u.id, u.first_name, u.last_name, u.user_name, u.email, u.password, \
     u.profile_picture, u.bio, u.last_login, u.role, u.reset_password_code, u.is_verified, \
     u.is_active, u.is_deleted, u.created_at, u.updated_at";

const TOKEN_COLUMNS: &str = "rt.id, rt.token, rt.ip_address, rt.issued_at, rt.expires_at, rt.user_id";

/// Number of columns produced by `TOKEN_COLUMNS`.
const TOKEN_WIDTH: usize = 6;

pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

pub struct NewRefreshToken {
    pub token: String,
    pub ip_address: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_id: i64,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Exact, case-sensitive match on either field.
    async fn exists_with_user_name_or_email(
        &self,
        user_name: &str,
        email: &str,
    ) -> Result<bool, RepositoryError>;

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    async fn set_reset_code(
        &self,
        id: i64,
        code: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Stores a new password hash and clears any pending reset code.
    async fn set_password(
        &self,
        id: i64,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn count_for_user(&self, user_id: i64) -> Result<i64, RepositoryError>;

    async fn find_for_user_and_ip(
        &self,
        user_id: i64,
        ip_address: &str,
    ) -> Result<Option<RefreshToken>, RepositoryError>;

    /// Looks a token up together with the user who owns it.
    async fn find_with_user(
        &self,
        token: &str,
    ) -> Result<Option<(RefreshToken, User)>, RepositoryError>;

    async fn exists(&self, token: &str) -> Result<bool, RepositoryError>;

    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshToken, RepositoryError>;

    async fn delete_by_token(&self, token: &str) -> Result<bool, RepositoryError>;

    async fn delete_for_user_except_ip(
        &self,
        user_id: i64,
        keep_ip: &str,
    ) -> Result<u64, RepositoryError>;
}

fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(offset)?,
        first_name: row.get(offset + 1)?,
        last_name: row.get(offset + 2)?,
        user_name: row.get(offset + 3)?,
        email: row.get(offset + 4)?,
        password: row.get(offset + 5)?,
        profile_picture: row.get(offset + 6)?,
        bio: row.get(offset + 7)?,
        last_login: row.get(offset + 8)?,
        role: row.get(offset + 9)?,
        reset_password_code: row.get(offset + 10)?,
        is_verified: row.get(offset + 11)?,
        is_active: row.get(offset + 12)?,
        is_deleted: row.get(offset + 13)?,
        created_at: row.get(offset + 14)?,
        updated_at: row.get(offset + 15)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<RefreshToken> {
    Ok(RefreshToken {
        id: row.get(0)?,
        token: row.get(1)?,
        ip_address: row.get(2)?,
        issued_at: row.get(3)?,
        expires_at: row.get(4)?,
        user_id: row.get(5)?,
    })
}

/// SQLite implementation
pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn find_one(
        &self,
        where_clause: &str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE {where_clause}");
        let user = conn
            .query_row(&sql, [value], |row| user_from_row(row, 0))
            .optional()?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        self.find_one("u.id = ?1", &id)
    }

    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one("u.user_name = ?1", &user_name)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one("u.email = ?1", &email)
    }

    async fn exists_with_user_name_or_email(
        &self,
        user_name: &str,
        email: &str,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let exists = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE user_name = ?1 OR email = ?2",
            params![user_name, email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let id = {
            let conn = self.pool.get()?;
            conn.execute(
                "INSERT INTO users (first_name, last_name, user_name, email, password, role,
                                    last_login, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)",
                params![
                    user.first_name,
                    user.last_name,
                    user.user_name,
                    user.email,
                    user.password_hash,
                    user.role,
                    user.created_at,
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.find_by_id(id)
            .await?
            .ok_or(RepositoryError::Sql(rusqlite::Error::QueryReturnedNoRows))
    }

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET last_login = ?2 WHERE id = ?1",
            params![id, at],
        )?;
        Ok(())
    }

    async fn set_reset_code(
        &self,
        id: i64,
        code: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET reset_password_code = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, code, at],
        )?;
        Ok(())
    }

    async fn set_password(
        &self,
        id: i64,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET password = ?2, reset_password_code = NULL, updated_at = ?3
             WHERE id = ?1",
            params![id, password_hash, at],
        )?;
        Ok(())
    }
}

pub struct SqliteRefreshTokenRepository {
    pool: DbPool,
}

impl SqliteRefreshTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for SqliteRefreshTokenRepository {
    async fn count_for_user(&self, user_id: i64) -> Result<i64, RepositoryError> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn find_for_user_and_ip(
        &self,
        user_id: i64,
        ip_address: &str,
    ) -> Result<Option<RefreshToken>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens rt
             WHERE rt.user_id = ?1 AND rt.ip_address = ?2
             ORDER BY rt.id DESC LIMIT 1"
        );
        let token = conn
            .query_row(&sql, params![user_id, ip_address], token_from_row)
            .optional()?;
        Ok(token)
    }

    async fn find_with_user(
        &self,
        token: &str,
    ) -> Result<Option<(RefreshToken, User)>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {TOKEN_COLUMNS}, {USER_COLUMNS} FROM refresh_tokens rt
             JOIN users u ON u.id = rt.user_id
             WHERE rt.token = ?1"
        );
        let found = conn
            .query_row(&sql, params![token], |row| {
                Ok((token_from_row(row)?, user_from_row(row, TOKEN_WIDTH)?))
            })
            .optional()?;
        Ok(found)
    }

    async fn exists(&self, token: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let exists = conn.query_row(
            "SELECT COUNT(*) > 0 FROM refresh_tokens WHERE token = ?1",
            params![token],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshToken, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO refresh_tokens (token, ip_address, issued_at, expires_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                token.token,
                token.ip_address,
                token.issued_at,
                token.expires_at,
                token.user_id
            ],
        )?;

        Ok(RefreshToken {
            id: conn.last_insert_rowid(),
            token: token.token,
            ip_address: token.ip_address,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
            user_id: token.user_id,
        })
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM refresh_tokens WHERE token = ?1",
            params![token],
        )?;
        Ok(rows > 0)
    }

    async fn delete_for_user_except_ip(
        &self,
        user_id: i64,
        keep_ip: &str,
    ) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM refresh_tokens WHERE user_id = ?1 AND ip_address != ?2",
            params![user_id, keep_ip],
        )?;
        Ok(rows as u64)
    }
}
