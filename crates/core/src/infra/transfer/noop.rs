use async_trait::async_trait;

use super::{TransferError, UploadTransport};

/// NoopTransport: 実際には転送せず固定レスポンスを返すスタブ実装。
/// エンドポイント未設定時の動作確認とテストに使う。
pub struct NoopTransport;

#[async_trait]
impl UploadTransport for NoopTransport {
    async fn upload(
        &self,
        file_name: &str,
        _data: Vec<u8>,
        _credential: &str,
    ) -> Result<serde_json::Value, TransferError> {
        Ok(serde_json::json!({
            "noop": true,
            "fileName": file_name,
        }))
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_returns_fixed_response() {
        let transport = NoopTransport;
        let result = transport
            .upload("hello.txt", b"hello".to_vec(), "tok")
            .await
            .unwrap();
        assert_eq!(result["noop"], true);
        assert_eq!(result["fileName"], "hello.txt");
    }

    #[test]
    fn test_noop_name() {
        assert_eq!(NoopTransport.name(), "noop");
    }
}
