pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{CommentNode, CommentPage, PageRequest};
pub use repository::{CommentRepository, NewComment, SqliteCommentRepository};
pub use service::{CommentError, CommentService};
