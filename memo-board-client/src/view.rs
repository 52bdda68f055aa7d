//! Board view state: the mirrored collection, pending input, and reply mode.
//!
//! The view forwards every gesture to a [`MemoStore`] and reconciles its
//! mirror with the store afterwards. The only rule enforced here is that
//! blank input never reaches the store.

use memo_board_types::{Memo, MemoError, MemoStore, find_memo_mut, remove_memo};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

/// How the mirror catches up after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Re-list the whole collection from the store.
    Refresh,
    /// Patch the mirror with what the store returned.
    ApplyLocally,
}

pub struct BoardView {
    store: Arc<dyn MemoStore>,
    policy: ReconcilePolicy,
    memos: Vec<Memo>,
    memo_draft: String,
    comment_drafts: HashMap<i64, String>,
    replying_to: Option<i64>,
}

impl BoardView {
    pub fn new(store: Arc<dyn MemoStore>, policy: ReconcilePolicy) -> Self {
        Self {
            store,
            policy,
            memos: Vec::new(),
            memo_draft: String::new(),
            comment_drafts: HashMap::new(),
            replying_to: None,
        }
    }

    pub fn memos(&self) -> &[Memo] {
        &self.memos
    }

    pub fn memo_draft(&self) -> &str {
        &self.memo_draft
    }

    pub fn comment_draft(&self, memo_id: i64) -> &str {
        self.comment_drafts
            .get(&memo_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn replying_to(&self) -> Option<i64> {
        self.replying_to
    }

    pub async fn load(&mut self) -> Result<(), MemoError> {
        self.memos = self.store.list().await?;
        Ok(())
    }

    pub fn set_memo_draft(&mut self, text: impl Into<String>) {
        self.memo_draft = text.into();
    }

    pub fn set_comment_draft(&mut self, memo_id: i64, text: impl Into<String>) {
        self.comment_drafts.insert(memo_id, text.into());
    }

    /// Puts `memo_id` in reply mode. Returns false if the memo is not shown.
    pub fn begin_reply(&mut self, memo_id: i64) -> bool {
        if self.memos.iter().any(|m| m.id == memo_id) {
            self.replying_to = Some(memo_id);
            true
        } else {
            false
        }
    }

    pub fn cancel_reply(&mut self) {
        self.replying_to = None;
    }

    /// Posts the memo draft. Returns `Ok(None)` without calling the store
    /// when the draft is blank.
    pub async fn submit_memo(&mut self) -> Result<Option<Memo>, MemoError> {
        if self.memo_draft.trim().is_empty() {
            return Ok(None);
        }
        let text = std::mem::take(&mut self.memo_draft);
        let memo = self.store.create(&text).await.inspect_err(|e| {
            log::warn!("Posting memo failed: {}", e);
        })?;
        if !self.refreshed().await {
            self.memos.push(memo.clone());
        }
        Ok(Some(memo))
    }

    /// Posts the draft for the memo in reply mode and leaves reply mode.
    pub async fn submit_comment(&mut self) -> Result<Option<Memo>, MemoError> {
        let Some(memo_id) = self.replying_to else {
            return Ok(None);
        };
        if self.comment_draft(memo_id).trim().is_empty() {
            return Ok(None);
        }
        let text = self.comment_drafts.remove(&memo_id).unwrap_or_default();
        self.replying_to = None;

        let updated = self
            .store
            .append_comment(memo_id, &text)
            .await
            .inspect_err(|e| log::warn!("Replying to memo #{} failed: {}", memo_id, e))?;
        if !self.refreshed().await {
            if let Some(memo) = find_memo_mut(&mut self.memos, memo_id) {
                *memo = updated.clone();
            }
        }
        Ok(Some(updated))
    }

    pub async fn delete_memo(&mut self, memo_id: i64) -> Result<bool, MemoError> {
        let removed = self
            .store
            .delete_memo(memo_id)
            .await
            .inspect_err(|e| log::warn!("Deleting memo #{} failed: {}", memo_id, e))?;
        self.comment_drafts.remove(&memo_id);
        if self.replying_to == Some(memo_id) {
            self.replying_to = None;
        }
        if !self.refreshed().await {
            remove_memo(&mut self.memos, memo_id);
        }
        Ok(removed)
    }

    pub async fn delete_comment(&mut self, memo_id: i64, comment_id: i64) -> Result<bool, MemoError> {
        let removed = self
            .store
            .delete_comment(memo_id, comment_id)
            .await
            .inspect_err(|e| log::warn!("Deleting comment #{} failed: {}", comment_id, e))?;
        if !self.refreshed().await {
            if let Some(memo) = find_memo_mut(&mut self.memos, memo_id) {
                memo.remove_comment(comment_id);
            }
        }
        Ok(removed)
    }

    /// Re-lists the board after a successful write under `Refresh`.
    /// Returns false when the mirror still has to be patched locally,
    /// including when the re-list fails.
    async fn refreshed(&mut self) -> bool {
        if self.policy != ReconcilePolicy::Refresh {
            return false;
        }
        match self.store.list().await {
            Ok(memos) => {
                self.memos = memos;
                true
            }
            Err(e) => {
                log::warn!("Reloading the board failed, applying the change locally: {}", e);
                false
            }
        }
    }

    /// Plain-text rendering of the board, oldest memo first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.memos.is_empty() {
            out.push_str("(no memos yet)\n");
        }
        for memo in &self.memos {
            let _ = writeln!(out, "[{}] {}  ({})", memo.id, memo.text, memo.timestamp);
            for comment in &memo.comments {
                let _ = writeln!(
                    out,
                    "    └ [{}] {}  ({})",
                    comment.id, comment.text, comment.timestamp
                );
            }
            if self.replying_to == Some(memo.id) {
                let _ = writeln!(out, "    > {}_", self.comment_draft(memo.id));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use memo_board_types::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and can be told to fail every mutation.
    struct CountingStore {
        inner: MemoryStore,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingStore {
        fn new(fail: bool) -> Self {
            Self {
                inner: MemoryStore::default(),
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn check(&self) -> Result<(), MemoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(MemoError::Storage("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl MemoStore for CountingStore {
        fn backend(&self) -> &'static str {
            "counting"
        }

        async fn list(&self) -> Result<Vec<Memo>, MemoError> {
            self.inner.list().await
        }

        async fn create(&self, text: &str) -> Result<Memo, MemoError> {
            self.check()?;
            self.inner.create(text).await
        }

        async fn append_comment(&self, memo_id: i64, text: &str) -> Result<Memo, MemoError> {
            self.check()?;
            self.inner.append_comment(memo_id, text).await
        }

        async fn delete_memo(&self, memo_id: i64) -> Result<bool, MemoError> {
            self.check()?;
            self.inner.delete_memo(memo_id).await
        }

        async fn delete_comment(&self, memo_id: i64, comment_id: i64) -> Result<bool, MemoError> {
            self.check()?;
            self.inner.delete_comment(memo_id, comment_id).await
        }
    }

    /// Lists successfully once, then every later list fails.
    struct ListOutageStore {
        inner: MemoryStore,
        lists: AtomicUsize,
    }

    #[async_trait]
    impl MemoStore for ListOutageStore {
        fn backend(&self) -> &'static str {
            "list-outage"
        }

        async fn list(&self) -> Result<Vec<Memo>, MemoError> {
            if self.lists.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(MemoError::Storage("list timed out".to_string()));
            }
            self.inner.list().await
        }

        async fn create(&self, text: &str) -> Result<Memo, MemoError> {
            self.inner.create(text).await
        }

        async fn append_comment(&self, memo_id: i64, text: &str) -> Result<Memo, MemoError> {
            self.inner.append_comment(memo_id, text).await
        }

        async fn delete_memo(&self, memo_id: i64) -> Result<bool, MemoError> {
            self.inner.delete_memo(memo_id).await
        }

        async fn delete_comment(&self, memo_id: i64, comment_id: i64) -> Result<bool, MemoError> {
            self.inner.delete_comment(memo_id, comment_id).await
        }
    }

    async fn post(view: &mut BoardView, text: &str) -> Memo {
        view.set_memo_draft(text);
        view.submit_memo().await.unwrap().unwrap()
    }

    async fn reply(view: &mut BoardView, memo_id: i64, text: &str) -> Memo {
        assert!(view.begin_reply(memo_id));
        view.set_comment_draft(memo_id, text);
        view.submit_comment().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_blank_drafts_never_reach_the_store() {
        let store = Arc::new(CountingStore::new(false));
        let mut view = BoardView::new(store.clone(), ReconcilePolicy::ApplyLocally);

        view.set_memo_draft("   ");
        assert!(view.submit_memo().await.unwrap().is_none());

        let memo = post(&mut view, "real").await;
        view.begin_reply(memo.id);
        view.set_comment_draft(memo.id, "");
        assert!(view.submit_comment().await.unwrap().is_none());
        assert_eq!(view.replying_to(), Some(memo.id), "blank reply keeps reply mode");

        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_clears_input_and_reply_mode() {
        let mut view = BoardView::new(Arc::new(MemoryStore::default()), ReconcilePolicy::Refresh);
        let memo = post(&mut view, "hello").await;
        assert_eq!(view.memo_draft(), "");

        let updated = reply(&mut view, memo.id, "hi back").await;
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(view.comment_draft(memo.id), "");
        assert_eq!(view.replying_to(), None);
        assert_eq!(view.memos()[0].comments[0].text, "hi back");
    }

    #[tokio::test]
    async fn test_failure_keeps_mirror_and_drops_input() {
        let store = Arc::new(CountingStore::new(true));
        store.inner.create("existing").await.unwrap();
        let mut view = BoardView::new(store, ReconcilePolicy::ApplyLocally);
        view.load().await.unwrap();
        let before = view.memos().to_vec();
        let memo_id = before[0].id;

        view.set_memo_draft("lost");
        assert!(view.submit_memo().await.is_err());
        assert_eq!(view.memo_draft(), "");

        view.begin_reply(memo_id);
        view.set_comment_draft(memo_id, "also lost");
        assert!(view.submit_comment().await.is_err());
        assert_eq!(view.comment_draft(memo_id), "");
        assert_eq!(view.replying_to(), None);

        assert!(view.delete_memo(memo_id).await.is_err());
        assert_eq!(view.memos(), before.as_slice());
    }

    #[tokio::test]
    async fn test_policies_converge_on_store_state() {
        for policy in [ReconcilePolicy::Refresh, ReconcilePolicy::ApplyLocally] {
            let store: Arc<dyn MemoStore> = Arc::new(MemoryStore::default());
            let mut view = BoardView::new(store.clone(), policy);

            let first = post(&mut view, "first").await;
            let second = post(&mut view, "second").await;
            reply(&mut view, first.id, "a").await;
            let with_b = reply(&mut view, first.id, "b").await;
            view.delete_comment(first.id, with_b.comments[0].id).await.unwrap();
            assert!(view.delete_memo(second.id).await.unwrap());

            assert_eq!(view.memos(), store.list().await.unwrap().as_slice(), "{:?}", policy);
            assert_eq!(view.memos().len(), 1);
            assert_eq!(view.memos()[0].comments[0].text, "b");
        }
    }

    #[tokio::test]
    async fn test_failed_reload_after_write_still_succeeds() {
        let store = Arc::new(ListOutageStore {
            inner: MemoryStore::default(),
            lists: AtomicUsize::new(0),
        });
        let mut view = BoardView::new(store.clone(), ReconcilePolicy::Refresh);
        view.load().await.unwrap();

        let memo = post(&mut view, "buy milk").await;
        assert_eq!(view.memos(), store.inner.list().await.unwrap().as_slice());
        assert!(view.load().await.is_err());

        let updated = reply(&mut view, memo.id, "ok").await;
        assert_eq!(view.memos()[0], updated);

        let removed = view.delete_comment(memo.id, updated.comments[0].id).await.unwrap();
        assert!(removed);
        assert!(view.memos()[0].comments.is_empty());

        assert!(view.delete_memo(memo.id).await.unwrap());
        assert!(view.memos().is_empty());
        assert!(store.inner.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_begin_reply_requires_shown_memo() {
        let mut view = BoardView::new(Arc::new(MemoryStore::default()), ReconcilePolicy::Refresh);
        assert!(!view.begin_reply(42));
        assert_eq!(view.replying_to(), None);
    }

    #[tokio::test]
    async fn test_deleting_reply_target_exits_reply_mode() {
        let mut view = BoardView::new(Arc::new(MemoryStore::default()), ReconcilePolicy::ApplyLocally);
        let memo = post(&mut view, "soon gone").await;
        view.begin_reply(memo.id);
        view.set_comment_draft(memo.id, "half typed");
        view.delete_memo(memo.id).await.unwrap();
        assert_eq!(view.replying_to(), None);
        assert_eq!(view.comment_draft(memo.id), "");
    }

    #[tokio::test]
    async fn test_render() {
        let mut view = BoardView::new(Arc::new(MemoryStore::default()), ReconcilePolicy::ApplyLocally);
        assert_eq!(view.render(), "(no memos yet)\n");

        let memo = post(&mut view, "groceries").await;
        reply(&mut view, memo.id, "milk").await;
        view.begin_reply(memo.id);
        view.set_comment_draft(memo.id, "eg");

        let text = view.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(&format!("[{}] groceries", memo.id)));
        assert!(lines[1].contains("milk"));
        assert_eq!(lines[2], "    > eg_");
    }
}
