//! JSON document store: the whole collection as one array in a file.

use async_trait::async_trait;
use memo_board_types::*;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles against the document.
    write_lock: Mutex<()>,
    stamper: Stamper,
}

impl JsonFileStore {
    pub async fn open(path: impl Into<PathBuf>, locale: Locale) -> Result<Self, MemoError> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            stamper: Stamper::new(locale),
        };
        for memo in store.read_memos().await? {
            store.stamper.observe(memo.max_id());
        }
        Ok(store)
    }

    /// A missing file is an empty collection.
    async fn read_memos(&self) -> Result<Vec<Memo>, MemoError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) if data.trim().is_empty() => Ok(Vec::new()),
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => {
                log::error!("Failed to read {}: {}", self.path.display(), e);
                Err(e.into())
            }
        }
    }

    async fn write_memos(&self, memos: &[Memo]) -> Result<(), MemoError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(memos)?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(data.as_bytes()).await?;
        // The rename must only ever expose a fully flushed document.
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            log::error!("Failed to write {}: {}", self.path.display(), e);
            MemoError::from(e)
        })
    }
}

#[async_trait]
impl MemoStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    async fn list(&self) -> Result<Vec<Memo>, MemoError> {
        let _guard = self.write_lock.lock().await;
        self.read_memos().await
    }

    async fn create(&self, text: &str) -> Result<Memo, MemoError> {
        validate_text("Text", text)?;
        let _guard = self.write_lock.lock().await;
        let mut memos = self.read_memos().await?;
        let memo = Memo::new(self.stamper.next_id()?, text, self.stamper.timestamp());
        memos.push(memo.clone());
        self.write_memos(&memos).await?;
        log::info!("Created memo #{}", memo.id);
        Ok(memo)
    }

    async fn append_comment(&self, memo_id: i64, text: &str) -> Result<Memo, MemoError> {
        validate_text("Comment", text)?;
        let _guard = self.write_lock.lock().await;
        let mut memos = self.read_memos().await?;
        let memo = find_memo_mut(&mut memos, memo_id)
            .ok_or_else(|| MemoError::memo_not_found(memo_id))?;
        let comment = Comment {
            id: self.stamper.next_id()?,
            text: text.to_string(),
            timestamp: self.stamper.timestamp(),
        };
        let comment_id = comment.id;
        memo.comments.push(comment);
        let updated = memo.clone();
        self.write_memos(&memos).await?;
        log::info!("Added comment #{} to memo #{}", comment_id, memo_id);
        Ok(updated)
    }

    async fn delete_memo(&self, memo_id: i64) -> Result<bool, MemoError> {
        let _guard = self.write_lock.lock().await;
        let mut memos = self.read_memos().await?;
        if !remove_memo(&mut memos, memo_id) {
            return Ok(false);
        }
        self.write_memos(&memos).await?;
        log::info!("Deleted memo #{}", memo_id);
        Ok(true)
    }

    async fn delete_comment(&self, memo_id: i64, comment_id: i64) -> Result<bool, MemoError> {
        let _guard = self.write_lock.lock().await;
        let mut memos = self.read_memos().await?;
        let memo = find_memo_mut(&mut memos, memo_id)
            .ok_or_else(|| MemoError::memo_not_found(memo_id))?;
        if !memo.remove_comment(comment_id) {
            return Ok(false);
        }
        self.write_memos(&memos).await?;
        log::info!("Deleted comment #{} from memo #{}", comment_id, memo_id);
        Ok(true)
    }
}
