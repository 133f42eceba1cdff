use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::domain::error::AppError;

/// バイナリを base64 data URL にエンコードする
pub fn encode(content_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(data))
}

/// base64 data URL をバイナリに復元する
pub fn decode(data_url: &str) -> Result<Vec<u8>, AppError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::decode("data URL ではありません"))?;
    let (_, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| AppError::decode("base64 エンコードの data URL ではありません"))?;
    STANDARD
        .decode(payload)
        .map_err(|e| AppError::decode(format!("base64 復号に失敗: {e}")))
}
