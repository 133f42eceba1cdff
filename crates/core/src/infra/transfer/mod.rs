pub mod pinata;
mod noop;

pub use noop::NoopTransport;

use async_trait::async_trait;

/// 転送エラー
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// リモートが非 2xx を返した。ステータスラインを保持する
    #[error("Upload failed: {0}")]
    Rejected(String),
    #[error("Upload request failed: {0}")]
    Network(String),
    #[error("Upload timeout")]
    Timeout,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// アップロード転送 trait（リモートエンドポイントごとに実装する）
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// ファイル 1 件を転送し、リモートの JSON レスポンスを返す
    async fn upload(
        &self,
        file_name: &str,
        data: Vec<u8>,
        credential: &str,
    ) -> Result<serde_json::Value, TransferError>;

    fn name(&self) -> &str;
}
