use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::db::models::UserProfile;
use crate::envelope::Envelope;
use crate::error::{AppError, AppResult};
use crate::extractors::{ClientIp, CurrentUser, JsonBody};
use crate::state::AppState;
use crate::validation::{self, Violations};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/profile/update-password", post(update_password))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub previous_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// GET /profile
async fn profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> AppResult<Envelope<UserProfile>> {
    let profile = state
        .sessions
        .profile(actor.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User Not Exist".into()))?;
    Ok(Envelope::ok("Profile Fetched Successfully", profile))
}

/// POST /profile/update-password
/// Every other device is signed out on success.
async fn update_password(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ClientIp(ip): ClientIp,
    JsonBody(body): JsonBody<UpdatePasswordRequest>,
) -> AppResult<Envelope<()>> {
    let mut v = Violations::new();
    v.check(
        validation::length_between(&body.previous_password, 6, 50),
        "previousPassword must be between 6 and 50 characters",
    )
    .check(
        validation::length_between(&body.new_password, 6, 50),
        "newPassword must be between 6 and 50 characters",
    );
    v.finish()?;

    state
        .sessions
        .change_password(actor.id, &body.previous_password, &body.new_password, &ip)
        .await?;
    Ok(Envelope::new(StatusCode::OK, "Password Updated Successfully", None))
}
