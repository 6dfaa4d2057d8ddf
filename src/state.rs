use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::{
    CredentialStore, SessionManager, SqliteRefreshTokenRepository, SqliteUserRepository,
    TokenKeys,
};
use crate::categories::{CategoryService, SqliteCategoryRepository};
use crate::comments::{CommentService, SqliteCommentRepository};
use crate::config::Config;
use crate::posts::{PostService, SqlitePostRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionManager>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub categories: Arc<CategoryService>,
}

impl AppState {
    /// Wires the SQLite repositories into the services.
    pub fn new(db: DbPool, config: Config) -> Self {
        let keys = Arc::new(TokenKeys::from_config(&config.auth));
        let credentials = CredentialStore::new(
            Arc::new(SqliteRefreshTokenRepository::new(db.clone())),
            keys.clone(),
            config.auth.max_logged_devices,
            config.auth.bcrypt_cost,
        );
        let sessions = SessionManager::new(
            Arc::new(SqliteUserRepository::new(db.clone())),
            credentials,
            keys,
        );

        let post_repo = Arc::new(SqlitePostRepository::new(db.clone()));
        let comments = Arc::new(CommentService::new(
            Arc::new(SqliteCommentRepository::new(db.clone())),
            post_repo.clone(),
        ));
        let posts = PostService::new(
            post_repo,
            comments.clone(),
            config.pagination.comments_per_page,
        );
        let categories = CategoryService::new(Arc::new(SqliteCategoryRepository::new(db)));

        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            posts: Arc::new(posts),
            comments,
            categories: Arc::new(categories),
        }
    }
}
