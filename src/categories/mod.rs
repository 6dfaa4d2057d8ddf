pub mod repository;
pub mod service;

pub use repository::{CategoryRepository, NewCategory, SqliteCategoryRepository};
pub use service::{CategoryError, CategoryPatch, CategoryService};
