use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::error::AppError;
use crate::domain::message::UploadEvent;
use crate::domain::upload::{UploadJob, UploadResult, UploadStatus};
use crate::infra::data_url;
use crate::infra::metrics::Metrics;
use crate::infra::scheduler::DrainTrigger;
use crate::infra::storage::Storage;
use crate::infra::transfer::UploadTransport;
use crate::usecase::events::EventHub;

/// 1 ドレインパスの結果件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    pub completed: u64,
    pub failed: u64,
}

/// Orchestrator: pending ジョブをスナップショットで取得し、
/// 1 件ずつ 転送 → 結果保存 → レコード削除 を進める。
/// ジョブ単位で失敗を隔離し、自動リトライはしない
pub struct Orchestrator {
    storage: Arc<Mutex<Storage>>,
    transport: Arc<dyn UploadTransport>,
    events: Arc<EventHub>,
    metrics: Arc<Metrics>,
    // ドレインパスの同時実行防止
    drain_lock: tokio::sync::Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        storage: Arc<Mutex<Storage>>,
        transport: Arc<dyn UploadTransport>,
        events: Arc<EventHub>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            storage,
            transport,
            events,
            metrics,
            drain_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// トリガー channel が閉じるまでドレイン要求を処理し続ける
    pub async fn run(self: Arc<Self>, mut trigger_rx: mpsc::UnboundedReceiver<DrainTrigger>) {
        log::info!("Upload orchestrator started ({})", self.transport.name());
        while let Some(trigger) = trigger_rx.recv().await {
            log::debug!("Drain trigger: {trigger:?}");
            if let Err(e) = self.drain().await {
                log::error!("ドレイン処理でエラー: {e}");
            }
        }
        log::info!("Upload orchestrator stopped");
    }

    /// pending ジョブを 1 パス処理する。
    /// パス中に enqueue されたジョブは次のトリガーまで処理されない
    pub async fn drain(&self) -> Result<DrainSummary, AppError> {
        // スナップショット取得から完了までロック下で行う
        let _guard = self.drain_lock.lock().await;
        let start = std::time::Instant::now();

        let pending = {
            let storage = self.storage.lock().unwrap();
            storage.get_uploads_by_status(UploadStatus::Pending)?
        };

        if pending.is_empty() {
            log::debug!("保留アップロードなし");
            return Ok(DrainSummary::default());
        }

        log::info!("{} 件の保留アップロードを処理します", pending.len());
        let mut summary = DrainSummary::default();

        for job in pending {
            match self.process_one(&job).await {
                Ok(()) => summary.completed += 1,
                Err(e) => {
                    // 1 件の失敗は記録してパスを続行する
                    log::error!("アップロード失敗 [{}]: {}", job.file_name, e);
                    self.mark_failed(&job, &e);
                    summary.failed += 1;
                }
            }
        }

        self.metrics.inc_drains_run();
        self.metrics
            .record_latency("drain", start.elapsed().as_millis() as u64);

        Ok(summary)
    }

    /// 1 件の転送。uploading 遷移 → 復号 → 転送 → 結果保存 → レコード削除
    async fn process_one(&self, job: &UploadJob) -> Result<(), AppError> {
        let now = chrono::Utc::now().to_rfc3339();
        {
            let storage = self.storage.lock().unwrap();
            storage.update_upload_status(&job.id, UploadStatus::Uploading, None, &now)?;
        }
        self.events.emit(UploadEvent::Started {
            upload_id: job.id.clone(),
        });

        let start = std::time::Instant::now();
        let data = data_url::decode(&job.file_data)?;

        let result = self
            .transport
            .upload(&job.file_name, data, &job.credential)
            .await
            .map_err(|e| AppError::transfer(e.to_string()))?;

        let completed_at = chrono::Utc::now().to_rfc3339();
        {
            let storage = self.storage.lock().unwrap();
            storage.put_result(&UploadResult {
                id: job.id.clone(),
                result: result.clone(),
                completed_at,
            })?;
            storage.remove_upload(&job.id)?;
        }

        self.metrics.inc_uploads_completed();
        self.metrics
            .record_latency("upload", start.elapsed().as_millis() as u64);
        self.events.emit(UploadEvent::Completed {
            upload_id: job.id.clone(),
            result,
        });
        log::info!("アップロード完了: {}", job.file_name);
        Ok(())
    }

    /// failed 記録と通知。レコードは削除せず手動リトライ・監査用に残す
    fn mark_failed(&self, job: &UploadJob, error: &AppError) {
        let now = chrono::Utc::now().to_rfc3339();
        {
            let storage = self.storage.lock().unwrap();
            if let Err(e) = storage.update_upload_status(
                &job.id,
                UploadStatus::Failed,
                Some(&error.message),
                &now,
            ) {
                log::error!("failed 記録に失敗 [{}]: {}", job.id, e);
            }
        }
        self.metrics.inc_uploads_failed();
        self.events.emit(UploadEvent::Failed {
            upload_id: job.id.clone(),
            error: error.message.clone(),
        });
    }
}
