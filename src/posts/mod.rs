pub mod repository;
pub mod service;

pub use repository::{
    AuthorSummary, CategorySummary, NewPost, PostRepository, PostView, SqlitePostRepository,
};
pub use service::{
    check_visibility, CreatePostInput, PostDetails, PostError, PostListing, PostPatch,
    PostService,
};
