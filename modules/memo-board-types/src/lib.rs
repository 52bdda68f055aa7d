//! Shared types for the memo board service and its clients.

pub mod error;
pub mod stamp;
pub mod store;

pub use error::MemoError;
pub use stamp::{IdGenerator, Locale, Stamper};
pub use store::{MemoStore, MemoryStore, validate_text};

use serde::{Deserialize, Serialize};

// =====================================================
// Domain Types
// =====================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub id: i64,
    pub text: String,
    pub timestamp: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Memo {
    pub fn new(id: i64, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            timestamp: timestamp.into(),
            comments: Vec::new(),
        }
    }

    /// Removes the comment with `comment_id`, returning whether one was present.
    pub fn remove_comment(&mut self, comment_id: i64) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != comment_id);
        self.comments.len() != before
    }

    /// Largest id used by this memo or any of its comments.
    pub fn max_id(&self) -> i64 {
        self.comments
            .iter()
            .map(|c| c.id)
            .fold(self.id, i64::max)
    }
}

/// Removes the memo with `memo_id` (and with it, its comments).
pub fn remove_memo(memos: &mut Vec<Memo>, memo_id: i64) -> bool {
    let before = memos.len();
    memos.retain(|m| m.id != memo_id);
    memos.len() != before
}

pub fn find_memo_mut(memos: &mut [Memo], memo_id: i64) -> Option<&mut Memo> {
    memos.iter_mut().find(|m| m.id == memo_id)
}

// =====================================================
// HTTP Request Types
// =====================================================

/// Body of `POST /memos`. Fields are optional so a missing field surfaces
/// as a validation error rather than a decode failure.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateMemoRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Body of `PUT /memos`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    #[serde(default)]
    pub memo_id: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Query string of `DELETE /memos`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    #[serde(default)]
    pub memo_id: Option<i64>,
    #[serde(default)]
    pub comment_id: Option<i64>,
}

// =====================================================
// HTTP Response Types
// =====================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    /// False when the target was already absent.
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub memo_count: usize,
    pub comment_count: usize,
    pub backend: String,
}
