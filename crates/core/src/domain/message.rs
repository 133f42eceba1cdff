use serde::{Deserialize, Serialize};

use super::upload::{UploadJob, UploadResult};

/// Orchestrator → Host の通知イベント
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UploadEvent {
    #[serde(rename = "UPLOAD_STARTED", rename_all = "camelCase")]
    Started { upload_id: String },
    #[serde(rename = "UPLOAD_COMPLETED", rename_all = "camelCase")]
    Completed {
        upload_id: String,
        result: serde_json::Value,
    },
    #[serde(rename = "UPLOAD_FAILED", rename_all = "camelCase")]
    Failed { upload_id: String, error: String },
}

impl UploadEvent {
    pub fn upload_id(&self) -> &str {
        match self {
            Self::Started { upload_id }
            | Self::Completed { upload_id, .. }
            | Self::Failed { upload_id, .. } => upload_id,
        }
    }
}

/// Host → Queue Store の実行コンテキスト境界越しリクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostRequest {
    #[serde(rename = "GET_PENDING_UPLOADS")]
    GetPendingUploads,
    #[serde(rename = "ADD_PENDING_UPLOAD")]
    AddPendingUpload { upload: UploadJob },
    #[serde(rename = "REMOVE_PENDING_UPLOAD")]
    RemovePendingUpload { id: String },
    #[serde(rename = "GET_UPLOAD_RESULT")]
    GetUploadResult { id: String },
}

/// HostRequest への応答
///
/// untagged のため並び順が復元順を決める。Result は全フィールドが
/// optional で任意のオブジェクトに一致するので、必ず最後に置く。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostResponse {
    Uploads { uploads: Vec<UploadJob> },
    Success { success: bool },
    Error { error: String },
    Result { result: Option<UploadResult> },
}
