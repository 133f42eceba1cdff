use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_DUPLICATE_ID")]
    DuplicateId,
    #[serde(rename = "E_NOT_FOUND")]
    NotFound,
    #[serde(rename = "E_TRANSFER")]
    Transfer,
    #[serde(rename = "E_DECODE")]
    Decode,
    #[serde(rename = "E_UNSUPPORTED")]
    Unsupported,
    #[serde(rename = "E_STORAGE")]
    Storage,
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

/// アプリケーションエラー（イベントペイロード兼用）
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    /// 既存 id への enqueue。id 生成側のバグを示す
    pub fn duplicate_id(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::DuplicateId,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: msg.into(),
            recoverable: true,
        }
    }

    /// リモートエンドポイントへの転送が失敗した（再 enqueue で回復可能）
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Transfer,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Decode,
            message: msg.into(),
            recoverable: false,
        }
    }

    /// この環境ではバックグラウンド実行が利用できない
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Unsupported,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Storage,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidState,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
