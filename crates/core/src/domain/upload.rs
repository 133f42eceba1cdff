use serde::{Deserialize, Serialize};

/// アップロード状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// DB カラム値からの復元
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "uploading" => Some(Self::Uploading),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// 前進遷移のみ許可する
    /// （pending → uploading → completed | failed。巻き戻しは再 enqueue のみ）
    pub fn can_transition_to(self, next: UploadStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Uploading)
                | (Self::Uploading, Self::Completed)
                | (Self::Uploading, Self::Failed)
        )
    }
}

/// 保留アップロードレコード（Queue Store に永続化される）
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadJob {
    pub id: String,
    pub file_name: String,
    /// ファイル本体の base64 data URL 表現（永続化に耐える形式）
    pub file_data: String,
    /// アップロード先の bearer トークン。ログ・Debug 出力には含めない
    pub credential: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UploadJob {
    pub fn new(
        id: String,
        file_name: String,
        file_data: String,
        credential: String,
        label: Option<String>,
        description: Option<String>,
        now: String,
    ) -> Self {
        Self {
            id,
            file_name,
            file_data,
            credential,
            label,
            description,
            status: UploadStatus::Pending,
            error: None,
            created_at: now,
            updated_at: None,
        }
    }
}

// credential と file_data 本体は Debug に出さない
impl std::fmt::Debug for UploadJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadJob")
            .field("id", &self.id)
            .field("file_name", &self.file_name)
            .field("file_data_len", &self.file_data.len())
            .field("credential", &"<redacted>")
            .field("label", &self.label)
            .field("status", &self.status)
            .field("error", &self.error)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// 完了したアップロードのリモートレスポンス
/// （ジョブレコード削除後も独立に照会できるよう別コレクションに保持する）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub id: String,
    /// リモートエンドポイントが返した JSON（例: コンテンツ識別子）
    pub result: serde_json::Value,
    pub completed_at: String,
}
