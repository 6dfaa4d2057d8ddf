// Domain types - pure, no I/O
use serde::Serialize;

use crate::db::models::Comment;

/// A comment plus how many direct replies it has.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub child_count: i64,
    pub has_child: bool,
}

impl CommentNode {
    pub fn new(comment: Comment, child_count: i64) -> Self {
        Self {
            comment,
            child_count,
            has_child: child_count > 0,
        }
    }
}

/// Offset pagination over one level of a comment tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self { page, per_page }
    }

    /// Saturates, so an absurd page number just lands past the end.
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.per_page.max(0))
    }

    /// Items left after this page, never negative.
    pub fn remaining(&self, total: i64) -> i64 {
        total
            .saturating_sub(self.offset().saturating_add(self.per_page))
            .max(0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<CommentNode>,
    pub total_comments_count: i64,
    pub remaining_comments_count: i64,
    pub page_number: i64,
    pub page_size: i64,
}

impl CommentPage {
    pub fn assemble(comments: Vec<CommentNode>, total: i64, request: PageRequest) -> Self {
        Self {
            comments,
            total_comments_count: total,
            remaining_comments_count: request.remaining(total),
            page_number: request.page,
            page_size: request.per_page,
        }
    }
}
