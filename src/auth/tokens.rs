use std::sync::Arc;

use super::error::TokenStoreError;
use super::jwt::TokenKeys;
use super::password::{self, PasswordHashError};
use super::repository::{NewRefreshToken, RefreshTokenRepository};
use crate::db::models::{RefreshToken, User};
use crate::db::{now, RepositoryError};

/// Password hashing plus the per-device refresh-token store.
///
/// A user holds at most one token per client IP and at most
/// `max_logged_devices` tokens overall.
#[derive(Clone)]
pub struct CredentialStore {
    tokens: Arc<dyn RefreshTokenRepository>,
    keys: Arc<TokenKeys>,
    max_logged_devices: u32,
    bcrypt_cost: u32,
}

impl CredentialStore {
    pub fn new(
        tokens: Arc<dyn RefreshTokenRepository>,
        keys: Arc<TokenKeys>,
        max_logged_devices: u32,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            tokens,
            keys,
            max_logged_devices,
            bcrypt_cost,
        }
    }

    /// bcrypt runs on the blocking pool so request handlers stay responsive.
    pub async fn hash_password(&self, plain: &str) -> Result<String, PasswordHashError> {
        let plain = plain.to_owned();
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain, cost)).await??;
        Ok(hash)
    }

    pub async fn verify_password(&self, plain: &str, hash: &str) -> bool {
        let plain = plain.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
            .await
            .unwrap_or(false)
    }

    pub async fn count_active_tokens(&self, user_id: i64) -> Result<i64, RepositoryError> {
        self.tokens.count_for_user(user_id).await
    }

    pub async fn has_reached_device_limit(&self, user_id: i64) -> Result<bool, RepositoryError> {
        let count = self.count_active_tokens(user_id).await?;
        Ok(count >= i64::from(self.max_logged_devices))
    }

    pub async fn find_token(
        &self,
        user_id: i64,
        ip_address: &str,
    ) -> Result<Option<RefreshToken>, RepositoryError> {
        self.tokens.find_for_user_and_ip(user_id, ip_address).await
    }

    pub async fn find_token_with_user(
        &self,
        token: &str,
    ) -> Result<Option<(RefreshToken, User)>, RepositoryError> {
        self.tokens.find_with_user(token).await
    }

    pub async fn is_live(&self, token: &str) -> Result<bool, RepositoryError> {
        self.tokens.exists(token).await
    }

    /// Signs and persists a fresh refresh token for `user` on `ip_address`.
    pub async fn issue_token(
        &self,
        user: &User,
        ip_address: &str,
    ) -> Result<RefreshToken, TokenStoreError> {
        if self.has_reached_device_limit(user.id).await? {
            return Err(TokenStoreError::DeviceLimitReached);
        }

        let issued_at = now();
        let (token, expires_at) = self.keys.issue_refresh(user, issued_at)?;
        let stored = self
            .tokens
            .insert(NewRefreshToken {
                token,
                ip_address: ip_address.to_owned(),
                issued_at,
                expires_at,
                user_id: user.id,
            })
            .await?;

        tracing::debug!(user_id = user.id, ip = %ip_address, "Refresh token issued");
        Ok(stored)
    }

    /// Returns whether a row was removed.
    pub async fn revoke_token(&self, token: &str) -> Result<bool, RepositoryError> {
        self.tokens.delete_by_token(token).await
    }

    pub async fn revoke_all_except(
        &self,
        user_id: i64,
        keep_ip: &str,
    ) -> Result<u64, RepositoryError> {
        let removed = self
            .tokens
            .delete_for_user_except_ip(user_id, keep_ip)
            .await?;
        if removed > 0 {
            tracing::info!(user_id, removed, keep_ip = %keep_ip, "Revoked refresh tokens on other devices");
        }
        Ok(removed)
    }
}
