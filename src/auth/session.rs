// Session lifecycle: signup, login, refresh, logout, password reset
use std::sync::Arc;

use super::error::{
    AuthenticateError, LoginError, PasswordChangeError, RefreshError, ResetError, SignupError,
};
use super::jwt::{TokenKeys, TokenRejection};
use super::password::{generate_reset_code, secrets_match};
use super::repository::{NewUser, UserRepository};
use super::tokens::CredentialStore;
use super::Actor;
use crate::db::models::{PublicUser, Role, UserProfile};
use crate::db::{now, RepositoryError};

/// Message returned from every reset request, whether or not the email matched.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists with the provided email, a reset link has been sent.";

pub struct SignupInput {
    pub first_name: String,
    pub last_name: Option<String>,
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug)]
pub struct LoginSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

pub struct SessionManager {
    users: Arc<dyn UserRepository>,
    credentials: CredentialStore,
    keys: Arc<TokenKeys>,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        credentials: CredentialStore,
        keys: Arc<TokenKeys>,
    ) -> Self {
        Self {
            users,
            credentials,
            keys,
        }
    }

    pub async fn signup(&self, input: SignupInput) -> Result<PublicUser, SignupError> {
        if self
            .users
            .exists_with_user_name_or_email(&input.user_name, &input.email)
            .await?
        {
            return Err(SignupError::DuplicateUser);
        }

        let password_hash = self.credentials.hash_password(&input.password).await?;
        let user = self
            .users
            .insert(NewUser {
                first_name: input.first_name,
                last_name: input.last_name.unwrap_or_default(),
                user_name: input.user_name,
                email: input.email,
                password_hash,
                role: input.role,
                created_at: now(),
            })
            .await
            .map_err(|err| match err {
                // Lost a race with a concurrent signup.
                RepositoryError::Conflict => SignupError::DuplicateUser,
                other => other.into(),
            })?;

        tracing::info!(user_id = user.id, user_name = %user.user_name, "User signed up");
        Ok(user.public())
    }

    /// Reuses the caller's refresh token when a live one already exists for this IP.
    pub async fn login(
        &self,
        user_name: &str,
        password: &str,
        client_ip: &str,
    ) -> Result<LoginSession, LoginError> {
        let user = self
            .users
            .find_by_user_name(user_name)
            .await?
            .ok_or(LoginError::UserNotFound)?;

        if !self
            .credentials
            .verify_password(password, &user.password)
            .await
        {
            tracing::warn!(user_name = %user_name, "Login rejected: bad credentials");
            return Err(LoginError::InvalidCredentials);
        }

        let access_token = self.keys.issue_access(&user)?;

        let refresh_token = match self.credentials.find_token(user.id, client_ip).await? {
            Some(existing) if existing.expires_at > now() => existing.token,
            Some(expired) => {
                // Same device, so swapping the row keeps the device count unchanged.
                self.credentials.revoke_token(&expired.token).await?;
                self.credentials.issue_token(&user, client_ip).await?.token
            }
            None => self.credentials.issue_token(&user, client_ip).await?.token,
        };

        self.users.record_login(user.id, now()).await?;
        tracing::info!(user_id = user.id, ip = %client_ip, "User logged in");

        Ok(LoginSession {
            access_token,
            refresh_token,
            user: user.public(),
        })
    }

    /// Idempotent: an unknown token is only worth a warning.
    pub async fn logout(&self, refresh_token: &str) -> Result<bool, RepositoryError> {
        let revoked = self.credentials.revoke_token(refresh_token).await?;
        if revoked {
            tracing::info!("Refresh token revoked on logout");
        } else {
            tracing::warn!("Logout with unknown refresh token");
        }
        Ok(revoked)
    }

    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, RefreshError> {
        let (_, owner) = self
            .credentials
            .find_token_with_user(refresh_token)
            .await?
            .ok_or(RefreshError::InvalidToken)?;

        let claims = self.keys.verify_refresh(refresh_token).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token failed verification");
            RefreshError::VerificationFailed
        })?;

        if claims.user_name != owner.user_name {
            return Err(RefreshError::InvalidUser);
        }

        Ok(self.keys.issue_access(&owner)?)
    }

    /// Stores a fresh reset code when the email is known. The caller always
    /// sees the same outcome so accounts cannot be enumerated.
    pub async fn initiate_password_reset(&self, email: &str) -> Result<&'static str, ResetError> {
        if let Some(user) = self.users.find_by_email(email).await? {
            let code = generate_reset_code();
            self.users.set_reset_code(user.id, Some(&code), now()).await?;
            tracing::info!(user_id = user.id, "Password reset code issued");
        }
        Ok(RESET_REQUESTED_MESSAGE)
    }

    pub async fn complete_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ResetError> {
        let user = self.users.find_by_email(email).await?;
        let matched = user.as_ref().is_some_and(|u| {
            u.reset_password_code
                .as_deref()
                .is_some_and(|stored| secrets_match(code, stored))
        });

        let user = match user {
            Some(user) if matched => user,
            _ => return Err(ResetError::InvalidTokenOrEmail),
        };

        let password_hash = self.credentials.hash_password(new_password).await?;
        self.users.set_password(user.id, &password_hash, now()).await?;
        tracing::info!(user_id = user.id, "Password reset completed");
        Ok(())
    }

    /// Changes the password and signs out every other device.
    pub async fn change_password(
        &self,
        user_id: i64,
        previous_password: &str,
        new_password: &str,
        client_ip: &str,
    ) -> Result<(), PasswordChangeError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(PasswordChangeError::InvalidUser)?;

        if self
            .credentials
            .verify_password(new_password, &user.password)
            .await
        {
            return Err(PasswordChangeError::SamePassword);
        }
        if !self
            .credentials
            .verify_password(previous_password, &user.password)
            .await
        {
            return Err(PasswordChangeError::InvalidPreviousPassword);
        }

        let password_hash = self.credentials.hash_password(new_password).await?;
        self.credentials.revoke_all_except(user.id, client_ip).await?;
        self.users.set_password(user.id, &password_hash, now()).await?;
        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    pub async fn profile(&self, user_id: i64) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.users.find_by_id(user_id).await?.map(|u| u.profile()))
    }

    /// Resolves the caller from a bearer access token, requiring that the
    /// refresh token presented alongside it has not been revoked.
    pub async fn authenticate(
        &self,
        bearer: Option<&str>,
        refresh_cookie: Option<&str>,
    ) -> Result<Actor, AuthenticateError> {
        let token = bearer.ok_or(AuthenticateError::MissingToken)?;
        let claims = self.keys.verify_access(token).map_err(|rejection| match rejection {
            TokenRejection::Expired => AuthenticateError::Expired,
            TokenRejection::Invalid => AuthenticateError::InvalidToken,
        })?;

        let cookie = refresh_cookie.ok_or(AuthenticateError::MissingSession)?;
        if !self.credentials.is_live(cookie).await? {
            return Err(AuthenticateError::RevokedSession);
        }

        Ok(Actor {
            id: claims.id,
            user_name: claims.user_name,
            email: claims.email,
            role: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::{SqliteRefreshTokenRepository, SqliteUserRepository};
    use crate::config::AuthConfig;
    use crate::db::models::User;
    use crate::db::{create_memory_pool, run_migrations};
    use chrono::{DateTime, Utc};

    fn manager(max_devices: u32) -> SessionManager {
        manager_with_users(max_devices).0
    }

    fn manager_with_users(max_devices: u32) -> (SessionManager, Arc<SqliteUserRepository>) {
        let pool = create_memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        let keys = Arc::new(TokenKeys::from_config(&AuthConfig {
            access_token_secret: "access".into(),
            refresh_token_secret: "refresh".into(),
            ..AuthConfig::default()
        }));
        let credentials = CredentialStore::new(
            Arc::new(SqliteRefreshTokenRepository::new(pool.clone())),
            keys.clone(),
            max_devices,
            4,
        );
        let users = Arc::new(SqliteUserRepository::new(pool));
        (SessionManager::new(users.clone(), credentials, keys), users)
    }

    fn signup_input(name: &str) -> SignupInput {
        SignupInput {
            first_name: "Test".into(),
            last_name: None,
            user_name: name.into(),
            email: format!("{name}@example.com"),
            password: "secret1".into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let sessions = manager(3);
        let user = sessions.signup(signup_input("alice")).await.unwrap();
        assert_eq!(user.user_name, "alice");

        let session = sessions.login("alice", "secret1", "10.0.0.1").await.unwrap();
        assert_eq!(session.user.id, user.id);
        assert!(!session.access_token.is_empty());
        assert!(!session.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_user_name_or_email_is_rejected() {
        let sessions = manager(3);
        sessions.signup(signup_input("alice")).await.unwrap();

        let mut same_email = signup_input("other");
        same_email.email = "alice@example.com".into();
        assert!(matches!(
            sessions.signup(same_email).await,
            Err(SignupError::DuplicateUser)
        ));
        assert!(matches!(
            sessions.signup(signup_input("alice")).await,
            Err(SignupError::DuplicateUser)
        ));
    }

    /// Answers "no duplicate" no matter what, like a check that ran before a
    /// concurrent signup committed.
    struct StaleDuplicateCheck(Arc<SqliteUserRepository>);

    #[async_trait::async_trait]
    impl UserRepository for StaleDuplicateCheck {
        async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
            self.0.find_by_id(id).await
        }

        async fn find_by_user_name(&self, name: &str) -> Result<Option<User>, RepositoryError> {
            self.0.find_by_user_name(name).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
            self.0.find_by_email(email).await
        }

        async fn exists_with_user_name_or_email(
            &self,
            _user_name: &str,
            _email: &str,
        ) -> Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
            self.0.insert(user).await
        }

        async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), RepositoryError> {
            self.0.record_login(id, at).await
        }

        async fn set_reset_code(
            &self,
            id: i64,
            code: Option<&str>,
            at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            self.0.set_reset_code(id, code, at).await
        }

        async fn set_password(
            &self,
            id: i64,
            password_hash: &str,
            at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            self.0.set_password(id, password_hash, at).await
        }
    }

    #[tokio::test]
    async fn signup_losing_a_race_is_still_a_duplicate() {
        let (sessions, users) = manager_with_users(3);
        sessions.signup(signup_input("alice")).await.unwrap();

        let racing = SessionManager::new(
            Arc::new(StaleDuplicateCheck(users)),
            sessions.credentials.clone(),
            sessions.keys.clone(),
        );
        assert!(matches!(
            racing.signup(signup_input("alice")).await,
            Err(SignupError::DuplicateUser)
        ));
    }

    #[tokio::test]
    async fn login_distinguishes_missing_user_from_bad_password() {
        let sessions = manager(3);
        sessions.signup(signup_input("alice")).await.unwrap();
        assert!(matches!(
            sessions.login("nobody", "secret1", "ip").await,
            Err(LoginError::UserNotFound)
        ));
        assert!(matches!(
            sessions.login("alice", "wrong", "ip").await,
            Err(LoginError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn same_ip_login_reuses_refresh_token() {
        let sessions = manager(1);
        sessions.signup(signup_input("alice")).await.unwrap();
        let first = sessions.login("alice", "secret1", "10.0.0.1").await.unwrap();
        let second = sessions.login("alice", "secret1", "10.0.0.1").await.unwrap();
        assert_eq!(first.refresh_token, second.refresh_token);
        assert!(matches!(
            sessions.login("alice", "secret1", "10.0.0.2").await,
            Err(LoginError::DeviceLimitReached)
        ));
    }

    #[tokio::test]
    async fn refresh_issues_access_token_until_logout() {
        let sessions = manager(3);
        sessions.signup(signup_input("alice")).await.unwrap();
        let session = sessions.login("alice", "secret1", "ip").await.unwrap();

        let access = sessions
            .refresh_access_token(&session.refresh_token)
            .await
            .unwrap();
        let actor = sessions
            .authenticate(Some(&access), Some(&session.refresh_token))
            .await
            .unwrap();
        assert_eq!(actor.user_name, "alice");

        assert!(sessions.logout(&session.refresh_token).await.unwrap());
        assert!(!sessions.logout(&session.refresh_token).await.unwrap());
        assert!(matches!(
            sessions.refresh_access_token(&session.refresh_token).await,
            Err(RefreshError::InvalidToken)
        ));
        assert!(matches!(
            sessions
                .authenticate(Some(&access), Some(&session.refresh_token))
                .await,
            Err(AuthenticateError::RevokedSession)
        ));
    }

    #[tokio::test]
    async fn authenticate_requires_bearer_and_cookie() {
        let sessions = manager(3);
        sessions.signup(signup_input("alice")).await.unwrap();
        let session = sessions.login("alice", "secret1", "ip").await.unwrap();

        assert!(matches!(
            sessions.authenticate(None, Some(&session.refresh_token)).await,
            Err(AuthenticateError::MissingToken)
        ));
        assert!(matches!(
            sessions.authenticate(Some(&session.access_token), None).await,
            Err(AuthenticateError::MissingSession)
        ));
        assert!(matches!(
            sessions
                .authenticate(Some("garbage"), Some(&session.refresh_token))
                .await,
            Err(AuthenticateError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn password_reset_round_trip() {
        let (sessions, users) = manager_with_users(3);
        sessions.signup(signup_input("alice")).await.unwrap();

        let message = sessions
            .initiate_password_reset("alice@example.com")
            .await
            .unwrap();
        assert_eq!(message, RESET_REQUESTED_MESSAGE);
        assert_eq!(
            sessions
                .initiate_password_reset("ghost@example.com")
                .await
                .unwrap(),
            RESET_REQUESTED_MESSAGE
        );

        let code = users
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap()
            .reset_password_code
            .unwrap();

        assert!(matches!(
            sessions
                .complete_password_reset("alice@example.com", "00000000", "newpass")
                .await,
            Err(ResetError::InvalidTokenOrEmail)
        ));
        sessions
            .complete_password_reset("alice@example.com", &code, "newpass")
            .await
            .unwrap();
        sessions.login("alice", "newpass", "ip").await.unwrap();

        // The code is single use.
        assert!(matches!(
            sessions
                .complete_password_reset("alice@example.com", &code, "again1")
                .await,
            Err(ResetError::InvalidTokenOrEmail)
        ));
    }

    #[tokio::test]
    async fn change_password_revokes_other_devices() {
        let sessions = manager(3);
        let user = sessions.signup(signup_input("alice")).await.unwrap();
        let here = sessions.login("alice", "secret1", "10.0.0.1").await.unwrap();
        let there = sessions.login("alice", "secret1", "10.0.0.2").await.unwrap();

        assert!(matches!(
            sessions
                .change_password(user.id, "secret1", "secret1", "10.0.0.1")
                .await,
            Err(PasswordChangeError::SamePassword)
        ));
        assert!(matches!(
            sessions
                .change_password(user.id, "wrong", "fresh1", "10.0.0.1")
                .await,
            Err(PasswordChangeError::InvalidPreviousPassword)
        ));

        sessions
            .change_password(user.id, "secret1", "fresh1", "10.0.0.1")
            .await
            .unwrap();
        assert!(sessions
            .refresh_access_token(&here.refresh_token)
            .await
            .is_ok());
        assert!(matches!(
            sessions.refresh_access_token(&there.refresh_token).await,
            Err(RefreshError::InvalidToken)
        ));
        sessions.login("alice", "fresh1", "10.0.0.1").await.unwrap();
    }
}
