use serde::{Deserialize, Serialize};

/// アップローダー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderSettings {
    /// アップロード先エンドポイント
    pub endpoint_url: String,
    /// multipart に付与する固定 `network` フィールドの値
    pub network: String,
    /// HTTP リクエストタイムアウト（秒）
    pub request_timeout_secs: u64,
    /// 完了結果と failed ジョブの保持期間（日数、0=無期限）
    pub retention_days: u32,
}

impl Default for UploaderSettings {
    fn default() -> Self {
        Self {
            endpoint_url: "https://uploads.pinata.cloud/v3/files".to_string(),
            network: "private".to_string(),
            request_timeout_secs: 30,
            retention_days: 0,
        }
    }
}
