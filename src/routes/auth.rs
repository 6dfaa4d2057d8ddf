use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::SignupInput;
use crate::config::AuthConfig;
use crate::db::models::{PublicUser, Role};
use crate::envelope::Envelope;
use crate::error::{AppError, AppResult};
use crate::extractors::{ClientIp, JsonBody, RefreshCookie};
use crate::state::AppState;
use crate::validation::{self, Violations};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", get(refresh_token))
        .route("/auth/logout", get(logout))
        .route("/auth/reset-password", post(reset_password))
}

// -- Request bodies --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

impl SignupRequest {
    fn validate(&self) -> AppResult<Role> {
        let mut v = Violations::new();
        v.check(
            validation::alphabetic(&self.first_name)
                && validation::length_between(&self.first_name, 1, 50),
            "firstName must contain only letters (1-50 characters)",
        )
        .check(
            self.last_name
                .as_deref()
                .map_or(true, |name| name.is_empty() || validation::alphabetic(name)),
            "lastName must contain only letters",
        )
        .check(
            validation::alphanumeric(&self.user_name),
            "userName must be a non-empty alphanumeric string",
        )
        .check(validation::email(&self.email), "email must be a valid email address")
        .check(
            validation::length_between(&self.password, 6, 50),
            "password must be between 6 and 50 characters",
        );

        let role = self.role.parse::<Role>();
        v.check(role.is_ok(), "role must be either User or Admin");
        v.finish()?;
        role.map_err(AppError::BadRequest)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub password: String,
}

/// Starts a reset when only `email` is sent, completes it when `token` and
/// `password` come along.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    token: String,
    user_data: PublicUser,
}

#[derive(Serialize)]
struct AccessTokenData {
    token: String,
}

// -- Cookies --

fn refresh_cookie(config: &AuthConfig, token: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}",
        config.cookie_name, token, max_age
    );
    if config.secure_cookie {
        cookie.push_str("; SameSite=None; Secure");
    } else {
        cookie.push_str("; SameSite=Lax");
    }
    cookie
}

fn cleared_cookie(config: &AuthConfig) -> String {
    refresh_cookie(config, "", 0)
}

// -- Handlers --

/// POST /auth/signup
async fn signup(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SignupRequest>,
) -> AppResult<Envelope<PublicUser>> {
    let role = body.validate()?;

    let user = state
        .sessions
        .signup(SignupInput {
            first_name: body.first_name,
            last_name: body.last_name,
            user_name: body.user_name,
            email: body.email,
            password: body.password,
            role,
        })
        .await?;

    Ok(Envelope::created("User Created Successfully", user))
}

/// POST /auth/login
/// Sets the refresh token as an HTTP-only cookie and returns the access token.
async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    JsonBody(body): JsonBody<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let mut v = Violations::new();
    v.check(validation::not_blank(&body.user_name), "userName must not be empty")
        .check(validation::not_blank(&body.password), "password must not be empty");
    v.finish()?;

    let session = state
        .sessions
        .login(&body.user_name, &body.password, &ip)
        .await?;

    let auth = &state.config.auth;
    let cookie = refresh_cookie(auth, &session.refresh_token, auth.cookie_max_age_secs);

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Envelope::created(
            "Login Successful",
            LoginData {
                token: session.access_token,
                user_data: session.user,
            },
        ),
    ))
}

/// GET /auth/refresh-token
async fn refresh_token(
    State(state): State<AppState>,
    RefreshCookie(cookie): RefreshCookie,
) -> AppResult<Envelope<AccessTokenData>> {
    let cookie = cookie.ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?;
    let token = state.sessions.refresh_access_token(&cookie).await?;
    Ok(Envelope::created("Token Refreshed", AccessTokenData { token }))
}

/// GET /auth/logout
/// Always clears the cookie, even when the token was already gone.
async fn logout(
    State(state): State<AppState>,
    RefreshCookie(cookie): RefreshCookie,
) -> AppResult<impl IntoResponse> {
    if let Some(token) = cookie {
        state.sessions.logout(&token).await?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, cleared_cookie(&state.config.auth))]),
    ))
}

/// POST /auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> AppResult<Envelope<()>> {
    let mut v = Violations::new();
    v.check(validation::email(&body.email), "email must be a valid email address");

    match (body.token.as_deref(), body.password.as_deref()) {
        (None, None) => {
            v.finish()?;
            let message = state.sessions.initiate_password_reset(&body.email).await?;
            Ok(Envelope::new(StatusCode::OK, message, None))
        }
        (token, password) => {
            let token = token.unwrap_or_default();
            let password = password.unwrap_or_default();
            v.check(validation::reset_code(token), "token must be an 8 digit code")
                .check(
                    password.chars().count() >= 6,
                    "password must be at least 6 characters",
                );
            v.finish()?;

            state
                .sessions
                .complete_password_reset(&body.email, token, password)
                .await?;
            Ok(Envelope::new(StatusCode::OK, "Password Updated Successfully", None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secure: bool) -> AuthConfig {
        AuthConfig {
            secure_cookie: secure,
            ..AuthConfig::default()
        }
    }

    #[test]
    fn secure_cookie_is_cross_site() {
        let cookie = refresh_cookie(&config(true), "abc", 86400);
        assert!(cookie.starts_with("jwt=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None; Secure"));
        assert!(cookie.contains("Max-Age=86400"));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = cleared_cookie(&config(false));
        assert!(cookie.starts_with("jwt=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn signup_validation_reports_all_problems() {
        let request = SignupRequest {
            first_name: "Ada1".into(),
            last_name: None,
            user_name: "ada_l".into(),
            email: "nope".into(),
            password: "123".into(),
            role: "Root".into(),
        };
        match request.validate() {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 5),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn valid_signup_yields_role() {
        let request = SignupRequest {
            first_name: "Ada".into(),
            last_name: Some("Lovelace".into()),
            user_name: "ada".into(),
            email: "ada@example.com".into(),
            password: "secret1".into(),
            role: "Admin".into(),
        };
        assert_eq!(request.validate().unwrap(), Role::Admin);
    }
}
