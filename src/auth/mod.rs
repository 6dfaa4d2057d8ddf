pub mod error;
pub mod jwt;
pub mod password;
pub mod repository;
pub mod session;
pub mod tokens;

use crate::db::models::Role;

pub use error::{
    AuthenticateError, LoginError, PasswordChangeError, RefreshError, ResetError, SignupError,
    TokenStoreError,
};
pub use jwt::TokenKeys;
pub use repository::{
    RefreshTokenRepository, SqliteRefreshTokenRepository, SqliteUserRepository, UserRepository,
};
pub use session::{LoginSession, SessionManager, SignupInput};
pub use tokens::CredentialStore;

/// The authenticated caller, as decoded from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
