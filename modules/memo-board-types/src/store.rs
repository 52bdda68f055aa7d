//! The memo store contract and its in-memory implementation.

use crate::{Comment, Memo, MemoError, Stamper, find_memo_mut, remove_memo};
use crate::stamp::Locale;
use async_trait::async_trait;
use parking_lot::Mutex;

/// Persistence for the memo collection. Every adapter (in-memory, JSON file,
/// SQLite table, remote HTTP) gives the same answers for the same calls.
///
/// Mutations are durable before they return, and appending a comment never
/// loses a concurrent append to the same memo.
#[async_trait]
pub trait MemoStore: Send + Sync {
    /// Short name of the backing storage, for logs and status output.
    fn backend(&self) -> &'static str;

    /// All memos, oldest first.
    async fn list(&self) -> Result<Vec<Memo>, MemoError>;

    async fn create(&self, text: &str) -> Result<Memo, MemoError>;

    /// Appends a comment and returns the updated memo.
    async fn append_comment(&self, memo_id: i64, text: &str) -> Result<Memo, MemoError>;

    /// Returns whether a memo was removed. Deleting an absent memo succeeds.
    async fn delete_memo(&self, memo_id: i64) -> Result<bool, MemoError>;

    /// Returns whether a comment was removed. Fails only when the memo is absent.
    async fn delete_comment(&self, memo_id: i64, comment_id: i64) -> Result<bool, MemoError>;
}

/// Rejects empty or whitespace-only text.
pub fn validate_text(field: &str, text: &str) -> Result<(), MemoError> {
    if text.trim().is_empty() {
        return Err(MemoError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub struct MemoryStore {
    memos: Mutex<Vec<Memo>>,
    stamper: Stamper,
}

impl MemoryStore {
    pub fn new(locale: Locale) -> Self {
        Self::with_memos(Vec::new(), locale)
    }

    /// Starts from an existing collection; new ids continue past the largest one.
    pub fn with_memos(memos: Vec<Memo>, locale: Locale) -> Self {
        let stamper = Stamper::new(locale);
        for memo in &memos {
            stamper.observe(memo.max_id());
        }
        Self {
            memos: Mutex::new(memos),
            stamper,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

#[async_trait]
impl MemoStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<Memo>, MemoError> {
        Ok(self.memos.lock().clone())
    }

    async fn create(&self, text: &str) -> Result<Memo, MemoError> {
        validate_text("Text", text)?;
        let mut memos = self.memos.lock();
        let memo = Memo::new(self.stamper.next_id()?, text, self.stamper.timestamp());
        memos.push(memo.clone());
        log::info!("Created memo #{}", memo.id);
        Ok(memo)
    }

    async fn append_comment(&self, memo_id: i64, text: &str) -> Result<Memo, MemoError> {
        validate_text("Comment", text)?;
        let mut memos = self.memos.lock();
        let memo = find_memo_mut(&mut memos, memo_id)
            .ok_or_else(|| MemoError::memo_not_found(memo_id))?;
        let comment = Comment {
            id: self.stamper.next_id()?,
            text: text.to_string(),
            timestamp: self.stamper.timestamp(),
        };
        log::info!("Added comment #{} to memo #{}", comment.id, memo_id);
        memo.comments.push(comment);
        Ok(memo.clone())
    }

    async fn delete_memo(&self, memo_id: i64) -> Result<bool, MemoError> {
        let removed = remove_memo(&mut self.memos.lock(), memo_id);
        if removed {
            log::info!("Deleted memo #{}", memo_id);
        }
        Ok(removed)
    }

    async fn delete_comment(&self, memo_id: i64, comment_id: i64) -> Result<bool, MemoError> {
        let mut memos = self.memos.lock();
        let memo = find_memo_mut(&mut memos, memo_id)
            .ok_or_else(|| MemoError::memo_not_found(memo_id))?;
        let removed = memo.remove_comment(comment_id);
        if removed {
            log::info!("Deleted comment #{} from memo #{}", comment_id, memo_id);
        }
        Ok(removed)
    }
}

/// Behavioral checks every `MemoStore` adapter must pass. Adapters call
/// [`conformance::run_all`] from their own tests.
#[cfg(any(test, feature = "test-util"))]
pub mod conformance {
    use super::*;
    use std::sync::Arc;

    pub async fn run_all(store: Arc<dyn MemoStore>) {
        create_assigns_unique_ids(store.as_ref()).await;
        blank_text_is_rejected(store.as_ref()).await;
        comments_append_in_order(store.as_ref()).await;
        comment_on_missing_memo_fails(store.as_ref()).await;
        delete_memo_cascades(store.as_ref()).await;
        delete_comment_keeps_siblings(store.as_ref()).await;
        concurrent_appends_are_kept(store).await;
    }

    pub async fn create_assigns_unique_ids(store: &dyn MemoStore) {
        let a = store.create("hello").await.unwrap();
        let b = store.create("world").await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.id > a.id);
        assert!(a.comments.is_empty());
        assert!(!a.timestamp.is_empty());

        let listed = store.list().await.unwrap();
        let hello = listed.iter().find(|m| m.id == a.id).unwrap();
        assert_eq!(hello.text, "hello");
        assert!(hello.comments.is_empty());

        let pos_a = listed.iter().position(|m| m.id == a.id).unwrap();
        let pos_b = listed.iter().position(|m| m.id == b.id).unwrap();
        assert!(pos_a < pos_b, "memos must list oldest first");
    }

    pub async fn blank_text_is_rejected(store: &dyn MemoStore) {
        let before = store.list().await.unwrap();
        for text in ["", "   ", "\n\t"] {
            let err = store.create(text).await.unwrap_err();
            assert!(matches!(err, MemoError::Validation(_)), "got {:?}", err);
        }
        assert_eq!(store.list().await.unwrap(), before);
    }

    pub async fn comments_append_in_order(store: &dyn MemoStore) {
        let memo = store.create("thread").await.unwrap();
        store.append_comment(memo.id, "first").await.unwrap();
        store.append_comment(memo.id, "second").await.unwrap();
        let updated = store.append_comment(memo.id, "third").await.unwrap();
        let texts: Vec<&str> = updated.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);

        let err = store.append_comment(memo.id, "  ").await.unwrap_err();
        assert!(matches!(err, MemoError::Validation(_)));

        let listed = store.list().await.unwrap();
        let stored = listed.iter().find(|m| m.id == memo.id).unwrap();
        assert_eq!(stored.comments, updated.comments);
    }

    pub async fn comment_on_missing_memo_fails(store: &dyn MemoStore) {
        let before = store.list().await.unwrap();
        let err = store.append_comment(-42, "orphan").await.unwrap_err();
        assert!(matches!(err, MemoError::NotFound(_)), "got {:?}", err);
        assert_eq!(store.list().await.unwrap(), before);
    }

    pub async fn delete_memo_cascades(store: &dyn MemoStore) {
        let keep = store.create("keep").await.unwrap();
        let doomed = store.create("doomed").await.unwrap();
        store.append_comment(doomed.id, "gone too").await.unwrap();

        assert!(store.delete_memo(doomed.id).await.unwrap());
        assert!(!store.delete_memo(doomed.id).await.unwrap());

        let listed = store.list().await.unwrap();
        assert!(listed.iter().all(|m| m.id != doomed.id));
        assert!(listed.iter().any(|m| m.id == keep.id));

        let err = store.delete_comment(doomed.id, 1).await.unwrap_err();
        assert!(matches!(err, MemoError::NotFound(_)));
    }

    pub async fn delete_comment_keeps_siblings(store: &dyn MemoStore) {
        let memo = store.create("siblings").await.unwrap();
        store.append_comment(memo.id, "a").await.unwrap();
        let with_b = store.append_comment(memo.id, "b").await.unwrap();
        store.append_comment(memo.id, "c").await.unwrap();
        let b_id = with_b.comments[1].id;

        assert!(store.delete_comment(memo.id, b_id).await.unwrap());
        assert!(!store.delete_comment(memo.id, b_id).await.unwrap());

        let listed = store.list().await.unwrap();
        let stored = listed.iter().find(|m| m.id == memo.id).unwrap();
        assert_eq!(stored.text, "siblings");
        let texts: Vec<&str> = stored.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c"]);
    }

    pub async fn concurrent_appends_are_kept(store: Arc<dyn MemoStore>) {
        let memo_id = store.create("busy").await.unwrap().id;
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append_comment(memo_id, &format!("reply {}", i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let listed = store.list().await.unwrap();
        let stored = listed.iter().find(|m| m.id == memo_id).unwrap();
        assert_eq!(stored.comments.len(), 16);
        let mut ids: Vec<i64> = stored.comments.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16, "comment ids must be unique");
    }
}
