use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use ff_core::domain::message::UploadEvent;
use ff_core::infra::storage::Storage;
use ff_core::infra::transfer::pinata::PinataTransport;
use ff_core::usecase::upload_service::UploadService;

/// DB パスを解決して UploadService を構築する
pub fn open_service(db: Option<PathBuf>) -> Result<UploadService> {
    let db_path = match db {
        Some(path) => path,
        None => match std::env::var("FF_DB_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let dir = dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("fileforward");
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("データディレクトリ作成に失敗: {}", dir.display()))?;
                dir.join("fileforward.db")
            }
        },
    };

    let storage = Storage::open(&db_path.to_string_lossy())
        .context("SQLite の初期化に失敗しました")?;
    // エンドポイントは保存済み設定から組み立てる
    let settings = storage.get_settings()?;
    let transport = Arc::new(PinataTransport::new(&settings));
    Ok(UploadService::new(storage, transport))
}

pub fn enqueue(
    service: &UploadService,
    file: &Path,
    token: Option<String>,
    label: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let Some(token) = token.or_else(|| std::env::var("FF_UPLOAD_TOKEN").ok()) else {
        bail!("--token か FF_UPLOAD_TOKEN 環境変数でトークンを指定してください");
    };

    let data = std::fs::read(file)
        .with_context(|| format!("ファイル読み込みに失敗: {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin");

    let id = service.enqueue(
        file_name,
        "application/octet-stream",
        &data,
        &token,
        label,
        description,
    )?;

    println!("{id}");
    Ok(())
}

pub fn list(service: &UploadService) -> Result<()> {
    let uploads = service.list_pending()?;
    if uploads.is_empty() {
        println!("キューは空です");
        return Ok(());
    }

    for upload in uploads {
        let error = upload
            .error
            .as_deref()
            .map(|e| format!("  ({e})"))
            .unwrap_or_default();
        println!(
            "{}  {:9}  {}{}",
            upload.id,
            upload.status.as_str(),
            upload.file_name,
            error
        );
    }
    Ok(())
}

pub async fn drain(service: &UploadService) -> Result<()> {
    let mut rx = service.subscribe();
    let summary = service.drain_now().await?;

    // ドレイン中のイベントは unbounded channel に溜まっている
    while let Ok(event) = rx.try_recv() {
        match event {
            UploadEvent::Started { upload_id } => log::info!("開始: {upload_id}"),
            UploadEvent::Completed { upload_id, result } => {
                println!("完了 {upload_id}: {result}")
            }
            UploadEvent::Failed { upload_id, error } => {
                eprintln!("失敗 {upload_id}: {error}")
            }
        }
    }

    println!("完了 {} 件 / 失敗 {} 件", summary.completed, summary.failed);
    Ok(())
}

pub fn result(service: &UploadService, id: &str) -> Result<()> {
    match service.get_result(id)? {
        Some(result) => {
            println!("{}", serde_json::to_string_pretty(&result.result)?);
            log::info!("completed_at: {}", result.completed_at);
        }
        None => println!("結果はまだありません: {id}"),
    }
    Ok(())
}

pub fn remove(service: &UploadService, id: &str) -> Result<()> {
    if service.remove_upload(id)? {
        println!("削除しました: {id}");
    } else {
        println!("レコードが見つかりません: {id}");
    }
    Ok(())
}

pub fn cleanup(service: &UploadService, days: u32) -> Result<()> {
    let (results, failed) = service.cleanup_old_data(days)?;
    println!("結果 {results} 件、failed {failed} 件を削除しました");
    Ok(())
}
