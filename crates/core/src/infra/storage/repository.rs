use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::error::AppError;
use crate::domain::settings::UploaderSettings;
use crate::domain::upload::{UploadJob, UploadResult, UploadStatus};

const SETTINGS_KEY: &str = "uploader";

/// SQLiteストレージ（pending_uploads + upload_results）
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// 新規接続（ファイルパス指定）
    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = Connection::open(path)
            .map_err(|e| AppError::storage(format!("DB接続に失敗: {e}")))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// in-memory DB（テスト用）
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::storage(format!("in-memory DB作成に失敗: {e}")))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// スキーママイグレーション
    fn migrate(&self) -> Result<(), AppError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS pending_uploads (
                    id          TEXT PRIMARY KEY,
                    file_name   TEXT NOT NULL,
                    file_data   TEXT NOT NULL,
                    credential  TEXT NOT NULL,
                    label       TEXT,
                    description TEXT,
                    status      TEXT NOT NULL DEFAULT 'pending',
                    error       TEXT,
                    created_at  TEXT NOT NULL,
                    updated_at  TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_pending_uploads_status
                    ON pending_uploads(status);

                CREATE TABLE IF NOT EXISTS upload_results (
                    id           TEXT PRIMARY KEY,
                    result       TEXT NOT NULL,
                    completed_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS settings (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                ",
            )
            .map_err(|e| AppError::storage(format!("マイグレーション失敗: {e}")))?;
        Ok(())
    }

    // --- Pending uploads ---

    /// 新規ジョブの挿入。id 重複は E_DUPLICATE_ID
    pub fn insert_upload(&self, job: &UploadJob) -> Result<(), AppError> {
        let result = self.conn.execute(
            "INSERT INTO pending_uploads
                 (id, file_name, file_data, credential, label, description,
                  status, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.file_name,
                job.file_data,
                job.credential,
                job.label,
                job.description,
                job.status.as_str(),
                job.error,
                job.created_at,
                job.updated_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(AppError::duplicate_id(format!(
                    "アップロード id が重複しています: {}",
                    job.id
                )))
            }
            Err(e) => Err(AppError::storage(format!("アップロード挿入失敗: {e}"))),
        }
    }

    pub fn get_upload(&self, id: &str) -> Result<Option<UploadJob>, AppError> {
        self.conn
            .query_row(
                "SELECT id, file_name, file_data, credential, label, description,
                        status, error, created_at, updated_at
                 FROM pending_uploads WHERE id = ?1",
                params![id],
                Self::map_upload_row,
            )
            .optional()
            .map_err(|e| AppError::storage(format!("アップロード取得失敗: {e}")))
    }

    /// status 一致のジョブ全件（ステータスインデックス経由、順序は不定）
    pub fn get_uploads_by_status(
        &self,
        status: UploadStatus,
    ) -> Result<Vec<UploadJob>, AppError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, file_name, file_data, credential, label, description,
                        status, error, created_at, updated_at
                 FROM pending_uploads WHERE status = ?1",
            )
            .map_err(|e| AppError::storage(format!("クエリ準備失敗: {e}")))?;

        let uploads = stmt
            .query_map(params![status.as_str()], Self::map_upload_row)
            .map_err(|e| AppError::storage(format!("クエリ実行失敗: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::storage(format!("行読み取り失敗: {e}")))?;

        Ok(uploads)
    }

    /// ストアに残っている全レコード（completed は削除済みなので含まれない）
    pub fn get_all_uploads(&self) -> Result<Vec<UploadJob>, AppError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, file_name, file_data, credential, label, description,
                        status, error, created_at, updated_at
                 FROM pending_uploads",
            )
            .map_err(|e| AppError::storage(format!("クエリ準備失敗: {e}")))?;

        let uploads = stmt
            .query_map([], Self::map_upload_row)
            .map_err(|e| AppError::storage(format!("クエリ実行失敗: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::storage(format!("行読み取り失敗: {e}")))?;

        Ok(uploads)
    }

    /// ステータス遷移の記録。前進遷移以外は E_INVALID_STATE、
    /// 対象レコードがなければ E_NOT_FOUND
    pub fn update_upload_status(
        &self,
        id: &str,
        next: UploadStatus,
        error: Option<&str>,
        now: &str,
    ) -> Result<(), AppError> {
        let current = self
            .get_upload(id)?
            .ok_or_else(|| AppError::not_found(format!("アップロードが存在しません: {id}")))?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::invalid_state(format!(
                "{} から {} へは遷移できません: {id}",
                current.status.as_str(),
                next.as_str()
            )));
        }

        self.conn
            .execute(
                "UPDATE pending_uploads SET status = ?1, error = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![next.as_str(), error, now, id],
            )
            .map_err(|e| AppError::storage(format!("ステータス更新失敗: {e}")))?;
        Ok(())
    }

    /// レコード削除。二重削除は許容し、削除が起きたかを返す
    pub fn remove_upload(&self, id: &str) -> Result<bool, AppError> {
        let affected = self
            .conn
            .execute("DELETE FROM pending_uploads WHERE id = ?1", params![id])
            .map_err(|e| AppError::storage(format!("アップロード削除失敗: {e}")))?;
        Ok(affected > 0)
    }

    // --- Upload results ---

    /// 完了結果の upsert
    pub fn put_result(&self, result: &UploadResult) -> Result<(), AppError> {
        let payload = serde_json::to_string(&result.result)
            .map_err(|e| AppError::internal(format!("result serialize: {e}")))?;
        self.conn
            .execute(
                "INSERT INTO upload_results (id, result, completed_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    result = excluded.result,
                    completed_at = excluded.completed_at",
                params![result.id, payload, result.completed_at],
            )
            .map_err(|e| AppError::storage(format!("結果保存失敗: {e}")))?;
        Ok(())
    }

    pub fn get_result(&self, id: &str) -> Result<Option<UploadResult>, AppError> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT id, result, completed_at FROM upload_results WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| AppError::storage(format!("結果取得失敗: {e}")))?;

        match row {
            None => Ok(None),
            Some((id, payload, completed_at)) => {
                let result = serde_json::from_str(&payload)
                    .map_err(|e| AppError::internal(format!("result parse: {e}")))?;
                Ok(Some(UploadResult {
                    id,
                    result,
                    completed_at,
                }))
            }
        }
    }

    // --- Settings ---

    pub fn get_settings(&self) -> Result<UploaderSettings, AppError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::storage(format!("設定取得失敗: {e}")))?;

        match value {
            None => Ok(UploaderSettings::default()),
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| AppError::internal(format!("settings parse: {e}"))),
        }
    }

    pub fn save_settings(&self, settings: &UploaderSettings) -> Result<(), AppError> {
        let json = serde_json::to_string(settings)
            .map_err(|e| AppError::internal(format!("settings serialize: {e}")))?;
        self.conn
            .execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![SETTINGS_KEY, json],
            )
            .map_err(|e| AppError::storage(format!("設定保存失敗: {e}")))?;
        Ok(())
    }

    // --- Retention ---

    /// cutoff より古い完了結果を削除する
    pub fn delete_old_results(&self, cutoff: &str) -> Result<u32, AppError> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM upload_results WHERE completed_at < ?1",
                params![cutoff],
            )
            .map_err(|e| AppError::storage(format!("結果クリーンアップ失敗: {e}")))?;
        Ok(affected as u32)
    }

    /// cutoff より古い failed ジョブを削除する（pending/uploading には触れない）
    pub fn delete_old_failed_uploads(&self, cutoff: &str) -> Result<u32, AppError> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM pending_uploads
                 WHERE status = 'failed' AND COALESCE(updated_at, created_at) < ?1",
                params![cutoff],
            )
            .map_err(|e| AppError::storage(format!("failed クリーンアップ失敗: {e}")))?;
        Ok(affected as u32)
    }

    fn map_upload_row(row: &rusqlite::Row) -> rusqlite::Result<UploadJob> {
        let status_str: String = row.get(6)?;

        Ok(UploadJob {
            id: row.get(0)?,
            file_name: row.get(1)?,
            file_data: row.get(2)?,
            credential: row.get(3)?,
            label: row.get(4)?,
            description: row.get(5)?,
            // 不明な status は failed 扱い（再送しない側に倒す）
            status: UploadStatus::parse(&status_str).unwrap_or(UploadStatus::Failed),
            error: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}
