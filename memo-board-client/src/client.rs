//! HTTP/JSON client for the standalone memo-board-service.
//!
//! Implements [`MemoStore`] so the board view can run against the service
//! exactly as it runs against a local store.

use async_trait::async_trait;
use memo_board_types::*;
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://127.0.0.1:9103";

pub struct MemoBoardClient {
    base_url: String,
    client: reqwest::Client,
}

impl MemoBoardClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MemoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MemoError::storage(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<ServiceStatus, MemoError> {
        let resp = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await
            .map_err(unavailable)?;
        decode(resp).await
    }

    fn memos_url(&self) -> String {
        format!("{}/memos", self.base_url)
    }
}

#[async_trait]
impl MemoStore for MemoBoardClient {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn list(&self) -> Result<Vec<Memo>, MemoError> {
        let resp = self
            .client
            .get(self.memos_url())
            .send()
            .await
            .map_err(unavailable)?;
        decode(resp).await
    }

    async fn create(&self, text: &str) -> Result<Memo, MemoError> {
        let req = CreateMemoRequest {
            text: Some(text.to_string()),
        };
        let resp = self
            .client
            .post(self.memos_url())
            .json(&req)
            .send()
            .await
            .map_err(unavailable)?;
        decode(resp).await
    }

    async fn append_comment(&self, memo_id: i64, text: &str) -> Result<Memo, MemoError> {
        let req = AddCommentRequest {
            memo_id: Some(memo_id),
            comment: Some(text.to_string()),
        };
        let resp = self
            .client
            .put(self.memos_url())
            .json(&req)
            .send()
            .await
            .map_err(unavailable)?;
        decode(resp).await
    }

    async fn delete_memo(&self, memo_id: i64) -> Result<bool, MemoError> {
        let resp = self
            .client
            .delete(self.memos_url())
            .query(&[("memoId", memo_id)])
            .send()
            .await
            .map_err(unavailable)?;
        decode::<DeleteResponse>(resp).await.map(|r| r.removed)
    }

    async fn delete_comment(&self, memo_id: i64, comment_id: i64) -> Result<bool, MemoError> {
        let resp = self
            .client
            .delete(self.memos_url())
            .query(&[("memoId", memo_id), ("commentId", comment_id)])
            .send()
            .await
            .map_err(unavailable)?;
        decode::<DeleteResponse>(resp).await.map(|r| r.removed)
    }
}

fn unavailable(e: reqwest::Error) -> MemoError {
    MemoError::Storage(format!("Memo board service unavailable: {}", e))
}

/// Turns a response into the payload, or back into the error the service reported.
async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, MemoError> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.map_err(|e| {
            MemoError::Storage(format!("Invalid response from memo board service: {}", e))
        });
    }

    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(if status == StatusCode::BAD_REQUEST {
        MemoError::Validation(message)
    } else if status == StatusCode::NOT_FOUND {
        MemoError::NotFound(message)
    } else {
        MemoError::Storage(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = MemoBoardClient::new("http://localhost:9103/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9103");
        assert_eq!(client.memos_url(), "http://localhost:9103/memos");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_storage_error() {
        // Nothing listens on the discard port.
        let client = MemoBoardClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.list().await.unwrap_err();
        assert!(matches!(err, MemoError::Storage(_)), "got {:?}", err);
    }
}
