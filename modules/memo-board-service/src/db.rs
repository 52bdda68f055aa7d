//! SQLite table store for memos.
//!
//! One row per memo; comments live in a JSON array column on that row.

use async_trait::async_trait;
use memo_board_types::*;
use parking_lot::Mutex;
use rusqlite::{OptionalExtension, TransactionBehavior};

pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
    stamper: Stamper,
}

impl SqliteStore {
    pub fn open(path: &str, locale: Locale) -> Result<Self, MemoError> {
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(path)
        }
        .map_err(MemoError::storage)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(MemoError::storage)?;
        let db = Self {
            conn: Mutex::new(conn),
            stamper: Stamper::new(locale),
        };
        db.create_tables()?;
        db.seed_ids()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<(), MemoError> {
        let conn = self.conn.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS memos (
                id INTEGER PRIMARY KEY,
                text TEXT NOT NULL,
                comments TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(MemoError::storage)?;
        Ok(())
    }

    fn seed_ids(&self) -> Result<(), MemoError> {
        let conn = self.conn.lock();
        let max_memo: Option<i64> = conn
            .query_row("SELECT MAX(id) FROM memos", [], |r| r.get(0))
            .map_err(MemoError::storage)?;
        let max_comment: Option<i64> = conn
            .query_row(
                "SELECT MAX(json_extract(c.value, '$.id'))
                 FROM memos, json_each(memos.comments) AS c",
                [],
                |r| r.get(0),
            )
            .map_err(MemoError::storage)?;
        for id in [max_memo, max_comment].into_iter().flatten() {
            self.stamper.observe(id);
        }
        Ok(())
    }
}

#[async_trait]
impl MemoStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn list(&self) -> Result<Vec<Memo>, MemoError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, text, created_at, comments FROM memos ORDER BY id ASC")
            .map_err(MemoError::storage)?;
        let memos = stmt
            .query_map([], row_to_memo)
            .map_err(MemoError::storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(MemoError::storage)?;
        Ok(memos)
    }

    async fn create(&self, text: &str) -> Result<Memo, MemoError> {
        validate_text("Text", text)?;
        let conn = self.conn.lock();
        let memo = Memo::new(self.stamper.next_id()?, text, self.stamper.timestamp());
        conn.execute(
            "INSERT INTO memos (id, text, comments, created_at) VALUES (?1, ?2, '[]', ?3)",
            rusqlite::params![memo.id, memo.text, memo.timestamp],
        )
        .map_err(|e| MemoError::storage(format!("Failed to insert memo: {}", e)))?;
        log::info!("Created memo #{}", memo.id);
        Ok(memo)
    }

    async fn append_comment(&self, memo_id: i64, text: &str) -> Result<Memo, MemoError> {
        validate_text("Comment", text)?;
        let conn = self.conn.lock();
        let comment = Comment {
            id: self.stamper.next_id()?,
            text: text.to_string(),
            timestamp: self.stamper.timestamp(),
        };
        let encoded = serde_json::to_string(&comment)?;

        // Append in place so concurrent writers never overwrite each other's comments.
        let updated = conn
            .execute(
                "UPDATE memos SET comments = json_insert(comments, '$[#]', json(?2))
                 WHERE id = ?1",
                rusqlite::params![memo_id, encoded],
            )
            .map_err(|e| MemoError::storage(format!("Failed to append comment: {}", e)))?;
        if updated == 0 {
            return Err(MemoError::memo_not_found(memo_id));
        }
        log::info!("Added comment #{} to memo #{}", comment.id, memo_id);

        get_memo_impl(&conn, memo_id)?.ok_or_else(|| MemoError::memo_not_found(memo_id))
    }

    async fn delete_memo(&self, memo_id: i64) -> Result<bool, MemoError> {
        let conn = self.conn.lock();
        let deleted = conn
            .execute("DELETE FROM memos WHERE id = ?1", rusqlite::params![memo_id])
            .map_err(|e| MemoError::storage(format!("Failed to delete memo: {}", e)))?;
        if deleted > 0 {
            log::info!("Deleted memo #{}", memo_id);
        }
        Ok(deleted > 0)
    }

    async fn delete_comment(&self, memo_id: i64, comment_id: i64) -> Result<bool, MemoError> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(MemoError::storage)?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT comments FROM memos WHERE id = ?1",
                rusqlite::params![memo_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(MemoError::storage)?;
        let raw = raw.ok_or_else(|| MemoError::memo_not_found(memo_id))?;

        let mut comments: Vec<Comment> = serde_json::from_str(&raw)?;
        let before = comments.len();
        comments.retain(|c| c.id != comment_id);
        let removed = comments.len() != before;

        if removed {
            tx.execute(
                "UPDATE memos SET comments = ?2 WHERE id = ?1",
                rusqlite::params![memo_id, serde_json::to_string(&comments)?],
            )
            .map_err(|e| MemoError::storage(format!("Failed to delete comment: {}", e)))?;
            tx.commit().map_err(MemoError::storage)?;
            log::info!("Deleted comment #{} from memo #{}", comment_id, memo_id);
        }
        Ok(removed)
    }
}

fn get_memo_impl(conn: &rusqlite::Connection, memo_id: i64) -> Result<Option<Memo>, MemoError> {
    conn.query_row(
        "SELECT id, text, created_at, comments FROM memos WHERE id = ?1",
        rusqlite::params![memo_id],
        row_to_memo,
    )
    .optional()
    .map_err(MemoError::storage)
}

fn row_to_memo(row: &rusqlite::Row) -> rusqlite::Result<Memo> {
    let raw: String = row.get(3)?;
    let comments = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Memo {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_board_types::store::conformance;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sqlite_store_conformance() {
        let store = SqliteStore::open(":memory:", Locale::KoKr).unwrap();
        conformance::run_all(Arc::new(store)).await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_memos_and_continues_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memos.db");
        let path = path.to_str().unwrap();

        let (memo, comment_id) = {
            let store = SqliteStore::open(path, Locale::KoKr).unwrap();
            let memo = store.create("persisted").await.unwrap();
            let updated = store.append_comment(memo.id, "still here").await.unwrap();
            (memo, updated.comments[0].id)
        };

        let store = SqliteStore::open(path, Locale::KoKr).unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, memo.id);
        assert_eq!(listed[0].comments[0].text, "still here");

        let next = store.create("later").await.unwrap();
        assert!(next.id > comment_id);
    }

    #[tokio::test]
    async fn test_comments_column_is_a_json_array() {
        let store = SqliteStore::open(":memory:", Locale::EnUs).unwrap();
        let memo = store.create("row").await.unwrap();
        store.append_comment(memo.id, "nested").await.unwrap();

        let conn = store.conn.lock();
        let raw: String = conn
            .query_row(
                "SELECT comments FROM memos WHERE id = ?1",
                rusqlite::params![memo.id],
                |r| r.get(0),
            )
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["text"], "nested");
        assert!(value[0]["id"].is_i64());
    }

    #[tokio::test]
    async fn test_missing_comment_leaves_row_untouched() {
        let store = SqliteStore::open(":memory:", Locale::KoKr).unwrap();
        let memo = store.create("row").await.unwrap();
        store.append_comment(memo.id, "keep").await.unwrap();
        assert!(!store.delete_comment(memo.id, 1).await.unwrap());
        assert_eq!(store.list().await.unwrap()[0].comments.len(), 1);
    }

    #[tokio::test]
    async fn test_max_id_in_table_fails_inserts_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memos.db");
        let path = path.to_str().unwrap();
        {
            let store = SqliteStore::open(path, Locale::KoKr).unwrap();
            store
                .conn
                .lock()
                .execute(
                    "INSERT INTO memos (id, text, comments, created_at) VALUES (?1, 'last', '[]', 't')",
                    rusqlite::params![i64::MAX],
                )
                .unwrap();
        }

        let store = SqliteStore::open(path, Locale::KoKr).unwrap();
        let err = store.create("new").await.unwrap_err();
        assert!(matches!(err, MemoError::Storage(_)), "got {:?}", err);
        let err = store.append_comment(i64::MAX, "reply").await.unwrap_err();
        assert!(matches!(err, MemoError::Storage(_)), "got {:?}", err);
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].comments.is_empty());
    }
}
