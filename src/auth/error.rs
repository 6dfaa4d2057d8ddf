// Per-operation failures of the auth subsystem
use thiserror::Error;

use super::password::PasswordHashError;
use crate::db::RepositoryError;
use crate::error::AppError;

/// Anything that is not the caller's fault.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("User with this email or username already exists")]
    DuplicateUser,

    #[error("signup failed: {0}")]
    Internal(#[from] InternalError),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("User Not Exist")]
    UserNotFound,

    #[error("Invalid Credentials")]
    InvalidCredentials,

    #[error("Maximum logged devices reached")]
    DeviceLimitReached,

    #[error("login failed: {0}")]
    Internal(#[from] InternalError),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Invalid Token")]
    InvalidToken,

    #[error("Token verification failed")]
    VerificationFailed,

    #[error("Invalid User")]
    InvalidUser,

    #[error("refresh failed: {0}")]
    Internal(#[from] InternalError),
}

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("Invalid token or email.")]
    InvalidTokenOrEmail,

    #[error("password reset failed: {0}")]
    Internal(#[from] InternalError),
}

#[derive(Debug, Error)]
pub enum PasswordChangeError {
    #[error("Invalid User")]
    InvalidUser,

    #[error("Same Password Can not be Updated")]
    SamePassword,

    #[error("Invalid Previous Password")]
    InvalidPreviousPassword,

    #[error("password change failed: {0}")]
    Internal(#[from] InternalError),
}

#[derive(Debug, Error)]
pub enum AuthenticateError {
    #[error("Unauthorized")]
    MissingToken,

    #[error("Access token expired")]
    Expired,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Unauthorized")]
    MissingSession,

    #[error("Session has been revoked")]
    RevokedSession,

    #[error("authentication failed: {0}")]
    Internal(#[from] InternalError),
}

/// Failures of the refresh-token store itself.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Maximum logged devices reached")]
    DeviceLimitReached,

    #[error(transparent)]
    Internal(#[from] InternalError),
}

macro_rules! internal_sources {
    ($($op:ty),+ $(,)?) => {$(
        impl From<RepositoryError> for $op {
            fn from(err: RepositoryError) -> Self {
                Self::Internal(err.into())
            }
        }

        impl From<PasswordHashError> for $op {
            fn from(err: PasswordHashError) -> Self {
                Self::Internal(err.into())
            }
        }

        impl From<jsonwebtoken::errors::Error> for $op {
            fn from(err: jsonwebtoken::errors::Error) -> Self {
                Self::Internal(err.into())
            }
        }
    )+};
}

internal_sources!(
    SignupError,
    LoginError,
    RefreshError,
    ResetError,
    PasswordChangeError,
    AuthenticateError,
    TokenStoreError,
);

impl From<TokenStoreError> for LoginError {
    fn from(err: TokenStoreError) -> Self {
        match err {
            TokenStoreError::DeviceLimitReached => LoginError::DeviceLimitReached,
            TokenStoreError::Internal(e) => LoginError::Internal(e),
        }
    }
}

// -- HTTP mapping --

impl From<SignupError> for AppError {
    fn from(err: SignupError) -> Self {
        match err {
            SignupError::DuplicateUser => AppError::BadRequest(err.to_string()),
            SignupError::Internal(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::UserNotFound => AppError::NotFound(err.to_string()),
            LoginError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            LoginError::DeviceLimitReached => AppError::NotAllowed(err.to_string()),
            LoginError::Internal(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::InvalidToken => AppError::Forbidden(err.to_string()),
            RefreshError::VerificationFailed | RefreshError::InvalidUser => {
                AppError::BadRequest(err.to_string())
            }
            RefreshError::Internal(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<ResetError> for AppError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::InvalidTokenOrEmail => AppError::BadRequest(err.to_string()),
            ResetError::Internal(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<PasswordChangeError> for AppError {
    fn from(err: PasswordChangeError) -> Self {
        match err {
            PasswordChangeError::Internal(_) => AppError::Internal(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<AuthenticateError> for AppError {
    fn from(err: AuthenticateError) -> Self {
        match err {
            AuthenticateError::MissingToken
            | AuthenticateError::Expired
            | AuthenticateError::MissingSession => AppError::Unauthorized(err.to_string()),
            AuthenticateError::InvalidToken | AuthenticateError::RevokedSession => {
                AppError::Forbidden(err.to_string())
            }
            AuthenticateError::Internal(_) => AppError::Internal(err.to_string()),
        }
    }
}
