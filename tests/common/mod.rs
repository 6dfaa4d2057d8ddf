//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use quill::auth::{Actor, SignupInput};
use quill::config::Config;
use quill::db::models::{PublicUser, Role};
use quill::db;
use quill::state::{AppState, DbPool};
use tempfile::TempDir;

pub const PASSWORD: &str = "secret1";

/// Keeps the temporary directory alive for as long as the state is in use.
pub struct TestApp {
    _dir: TempDir,
    pub pool: DbPool,
    pub state: AppState,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.access_token_secret = "test-access-secret".into();
    config.auth.refresh_token_secret = "test-refresh-secret".into();
    config.auth.bcrypt_cost = 4;
    config
}

pub fn setup() -> TestApp {
    setup_with(test_config())
}

pub fn setup_with(config: Config) -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("test.db"), &config.database)
        .expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    TestApp {
        _dir: dir,
        pool: pool.clone(),
        state: AppState::new(pool, config),
    }
}

pub async fn signup(state: &AppState, name: &str, role: Role) -> PublicUser {
    state
        .sessions
        .signup(SignupInput {
            first_name: "Test".into(),
            last_name: None,
            user_name: name.into(),
            email: format!("{name}@example.com"),
            password: PASSWORD.into(),
            role,
        })
        .await
        .unwrap()
}

pub async fn actor(state: &AppState, name: &str, role: Role) -> Actor {
    let user = signup(state, name, role).await;
    Actor {
        id: user.id,
        user_name: user.user_name,
        email: user.email,
        role,
    }
}
