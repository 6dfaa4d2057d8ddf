// Library exports for Quill
// The binary and the integration tests both build on these modules

pub mod auth;
pub mod categories;
pub mod comments;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod extractors;
pub mod posts;
pub mod routes;
pub mod state;
pub mod validation;
