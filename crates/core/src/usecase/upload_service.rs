use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::error::AppError;
use crate::domain::message::{HostRequest, HostResponse, UploadEvent};
use crate::domain::settings::UploaderSettings;
use crate::domain::upload::{UploadJob, UploadResult};
use crate::infra::data_url;
use crate::infra::metrics::{Metrics, MetricsSummary};
use crate::infra::scheduler::{DrainScheduler, DrainTrigger, TokioDrainScheduler};
use crate::infra::storage::Storage;
use crate::infra::transfer::UploadTransport;
use crate::usecase::events::EventHub;
use crate::usecase::orchestrator::{DrainSummary, Orchestrator};

/// Host Bridge の初期化状態。Ready / Unsupported は終端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeState {
    Uninitialized,
    Ready,
    Unsupported,
}

/// initialize() の結果
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub background_sync: bool,
}

/// アップロードサービス（Host Bridge）。
/// フォアグラウンド側はこの型だけを通じて enqueue・照会・購読を行う
pub struct UploadService {
    storage: Arc<Mutex<Storage>>,
    orchestrator: Arc<Orchestrator>,
    events: Arc<EventHub>,
    metrics: Arc<Metrics>,
    scheduler: Arc<dyn DrainScheduler>,
    trigger_rx: Mutex<Option<mpsc::UnboundedReceiver<DrainTrigger>>>,
    state: Mutex<BridgeState>,
    online: AtomicBool,
}

impl UploadService {
    pub fn new(storage: Storage, transport: Arc<dyn UploadTransport>) -> Self {
        Self::build(storage, transport, None)
    }

    /// プラットフォームアダプタを差し替えて構築する
    /// （バックグラウンド実行を持たない環境では UnsupportedScheduler を渡す）
    pub fn with_scheduler(
        storage: Storage,
        transport: Arc<dyn UploadTransport>,
        scheduler: Arc<dyn DrainScheduler>,
    ) -> Self {
        Self::build(storage, transport, Some(scheduler))
    }

    fn build(
        storage: Storage,
        transport: Arc<dyn UploadTransport>,
        scheduler: Option<Arc<dyn DrainScheduler>>,
    ) -> Self {
        let storage = Arc::new(Mutex::new(storage));
        let events = Arc::new(EventHub::new());
        let metrics = Arc::new(Metrics::new());
        let orchestrator = Arc::new(Orchestrator::new(
            storage.clone(),
            transport,
            events.clone(),
            metrics.clone(),
        ));

        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let scheduler =
            scheduler.unwrap_or_else(|| Arc::new(TokioDrainScheduler::new(trigger_tx)));

        Self {
            storage,
            orchestrator,
            events,
            metrics,
            scheduler,
            trigger_rx: Mutex::new(Some(trigger_rx)),
            state: Mutex::new(BridgeState::Uninitialized),
            online: AtomicBool::new(true),
        }
    }

    // ==================== Lifecycle ====================

    /// Orchestrator タスクを起動する。冪等で、2 回目以降は同じ結果を返す。
    /// Tokio ランタイム上で呼ぶこと
    pub fn initialize(&self) -> Readiness {
        let mut state = self.state.lock().unwrap();
        match *state {
            BridgeState::Ready => {
                return Readiness {
                    ready: true,
                    background_sync: true,
                }
            }
            BridgeState::Unsupported => {
                return Readiness {
                    ready: false,
                    background_sync: false,
                }
            }
            BridgeState::Uninitialized => {}
        }

        if !self.scheduler.supported() {
            log::warn!("バックグラウンド同期がこの環境では利用できません");
            *state = BridgeState::Unsupported;
            return Readiness {
                ready: false,
                background_sync: false,
            };
        }

        if let Some(trigger_rx) = self.trigger_rx.lock().unwrap().take() {
            tokio::spawn(self.orchestrator.clone().run(trigger_rx));
        }
        *state = BridgeState::Ready;

        Readiness {
            ready: true,
            background_sync: true,
        }
    }

    pub fn background_sync_supported(&self) -> bool {
        self.scheduler.supported()
    }

    // ==================== Enqueue / Drain ====================

    /// ファイルを data URL にエンコードして pending として永続化する
    pub fn enqueue(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        credential: &str,
        label: Option<String>,
        description: Option<String>,
    ) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let file_data = data_url::encode(content_type, data);

        let job = UploadJob::new(
            id.clone(),
            file_name.to_string(),
            file_data,
            credential.to_string(),
            label,
            description,
            now,
        );

        {
            let storage = self.storage.lock().unwrap();
            storage.insert_upload(&job)?;
        }
        self.metrics.inc_uploads_enqueued();
        log::info!("アップロードをキューに追加: {file_name} ({id})");
        Ok(id)
    }

    /// 次の機会のドレインを予約する
    pub fn request_drain(&self) -> Result<(), AppError> {
        match *self.state.lock().unwrap() {
            BridgeState::Ready => {}
            BridgeState::Unsupported => {
                return Err(AppError::unsupported(
                    "バックグラウンド同期が利用できません。drain_now を使用してください",
                ))
            }
            BridgeState::Uninitialized => {
                return Err(AppError::invalid_state("initialize() が呼ばれていません"))
            }
        }
        self.scheduler.schedule(DrainTrigger::Manual)
    }

    /// フォアグラウンドでドレインを完了まで実行する（request_drain の代替パス）
    pub async fn drain_now(&self) -> Result<DrainSummary, AppError> {
        self.orchestrator.drain().await
    }

    /// ネットワーク状態の通知。オフライン → オンライン復帰でドレインを予約する
    pub fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::Relaxed);
        if online && !was_online {
            log::info!("ネットワーク復帰を検出、保留アップロードを確認します");
            if let Err(e) = self.scheduler.schedule(DrainTrigger::OnlineRestored) {
                log::warn!("ドレイン予約に失敗: {e}");
            }
        }
    }

    // ==================== Queries ====================

    /// ストアに残っている全レコード（pending / uploading / failed）。
    /// completed は削除済みのため現れない
    pub fn list_pending(&self) -> Result<Vec<UploadJob>, AppError> {
        let storage = self.storage.lock().unwrap();
        storage.get_all_uploads()
    }

    pub fn get_result(&self, id: &str) -> Result<Option<UploadResult>, AppError> {
        let storage = self.storage.lock().unwrap();
        storage.get_result(id)
    }

    /// レコード削除。存在しない id は no-op（削除が起きたかを返す）
    pub fn remove_upload(&self, id: &str) -> Result<bool, AppError> {
        let storage = self.storage.lock().unwrap();
        storage.remove_upload(id)
    }

    // ==================== Events ====================

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UploadEvent> {
        self.events.subscribe()
    }

    // ==================== Message boundary ====================

    /// 実行コンテキスト境界越しのリクエストを処理する。
    /// 失敗は例外ではなく error 応答として返す
    pub fn handle_request(&self, request: HostRequest) -> HostResponse {
        match request {
            HostRequest::GetPendingUploads => match self.list_pending() {
                Ok(uploads) => HostResponse::Uploads { uploads },
                Err(e) => HostResponse::Error {
                    error: e.to_string(),
                },
            },
            HostRequest::AddPendingUpload { upload } => {
                let inserted = {
                    let storage = self.storage.lock().unwrap();
                    storage.insert_upload(&upload)
                };
                match inserted {
                    Ok(()) => {
                        self.metrics.inc_uploads_enqueued();
                        HostResponse::Success { success: true }
                    }
                    Err(e) => HostResponse::Error {
                        error: e.to_string(),
                    },
                }
            }
            HostRequest::RemovePendingUpload { id } => match self.remove_upload(&id) {
                Ok(_) => HostResponse::Success { success: true },
                Err(e) => HostResponse::Error {
                    error: e.to_string(),
                },
            },
            HostRequest::GetUploadResult { id } => match self.get_result(&id) {
                Ok(result) => HostResponse::Result { result },
                Err(e) => HostResponse::Error {
                    error: e.to_string(),
                },
            },
        }
    }

    // ==================== Settings ====================

    pub fn get_settings(&self) -> Result<UploaderSettings, AppError> {
        let storage = self.storage.lock().unwrap();
        storage.get_settings()
    }

    pub fn update_settings(&self, settings: UploaderSettings) -> Result<(), AppError> {
        let storage = self.storage.lock().unwrap();
        storage.save_settings(&settings)
    }

    // ==================== Metrics ====================

    pub fn get_metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    // ==================== Data Protection ====================

    /// 保持期間を過ぎた完了結果と failed レコードを削除する。
    /// 戻り値は (results, failed_uploads) の削除件数
    pub fn cleanup_old_data(&self, ttl_days: u32) -> Result<(u32, u32), AppError> {
        if ttl_days == 0 {
            return Ok((0, 0));
        }

        let cutoff = chrono::Utc::now() - chrono::Duration::days(ttl_days as i64);
        let cutoff_str = cutoff.to_rfc3339();

        let storage = self.storage.lock().unwrap();
        let results_deleted = storage.delete_old_results(&cutoff_str)?;
        let failed_deleted = storage.delete_old_failed_uploads(&cutoff_str)?;

        log::info!(
            "データクリーンアップ: 結果 {results_deleted} 件、failed {failed_deleted} 件削除（TTL: {ttl_days}日）"
        );

        Ok((results_deleted, failed_deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::upload::UploadStatus;
    use crate::infra::scheduler::UnsupportedScheduler;
    use crate::infra::transfer::NoopTransport;

    fn service() -> UploadService {
        UploadService::new(Storage::open_in_memory().unwrap(), Arc::new(NoopTransport))
    }

    #[tokio::test]
    async fn test_enqueue_then_list() {
        let service = service();
        let id = service
            .enqueue("hello.txt", "text/plain", b"hello", "tok-123", None, None)
            .unwrap();

        let pending = service.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].file_name, "hello.txt");
        assert_eq!(pending[0].status, UploadStatus::Pending);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let service = service();
        let first = service.initialize();
        let second = service.initialize();
        assert!(first.ready && first.background_sync);
        assert!(second.ready && second.background_sync);
    }

    #[tokio::test]
    async fn test_unsupported_platform_readiness() {
        let service = UploadService::with_scheduler(
            Storage::open_in_memory().unwrap(),
            Arc::new(NoopTransport),
            Arc::new(UnsupportedScheduler),
        );

        let readiness = service.initialize();
        assert!(!readiness.ready);
        assert!(!readiness.background_sync);
        assert!(!service.background_sync_supported());

        let err = service.request_drain().unwrap_err();
        assert_eq!(err.code, ErrorCode::Unsupported);

        // フォアグラウンドの代替パスは使える
        let id = service
            .enqueue("a.txt", "text/plain", b"a", "tok", None, None)
            .unwrap();
        let summary = service.drain_now().await.unwrap();
        assert_eq!(summary.completed, 1);
        assert!(service.get_result(&id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_request_drain_before_initialize() {
        let service = service();
        let err = service.request_drain().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_request_drain_processes_queue() {
        let service = service();
        service.initialize();
        let mut rx = service.subscribe();

        let id = service
            .enqueue("hello.txt", "text/plain", b"hello", "tok-123", None, None)
            .unwrap();
        service.request_drain().unwrap();

        // バックグラウンドタスクからの通知を待つ
        let started = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(started, UploadEvent::Started { .. }));

        let completed = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match completed {
            UploadEvent::Completed { upload_id, .. } => assert_eq!(upload_id, id),
            other => panic!("unexpected event: {other:?}"),
        }

        assert!(service.list_pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_online_transition_schedules_drain() {
        let service = service();
        service.initialize();
        let mut rx = service.subscribe();

        service
            .enqueue("hello.txt", "text/plain", b"hello", "tok-123", None, None)
            .unwrap();

        service.set_online(false);
        service.set_online(true);

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, UploadEvent::Started { .. }));
    }

    #[tokio::test]
    async fn test_handle_request_message_boundary() {
        let service = service();

        let job = UploadJob::new(
            "job-1".to_string(),
            "hello.txt".to_string(),
            data_url::encode("text/plain", b"hello"),
            "tok".to_string(),
            None,
            None,
            chrono::Utc::now().to_rfc3339(),
        );

        let response = service.handle_request(HostRequest::AddPendingUpload { upload: job });
        assert!(matches!(response, HostResponse::Success { success: true }));

        let response = service.handle_request(HostRequest::GetPendingUploads);
        match response {
            HostResponse::Uploads { uploads } => {
                assert_eq!(uploads.len(), 1);
                assert_eq!(uploads[0].id, "job-1");
            }
            other => panic!("unexpected response: {other:?}"),
        }

        // 未完了ジョブの結果は null 相当
        let response = service.handle_request(HostRequest::GetUploadResult {
            id: "job-1".to_string(),
        });
        assert!(matches!(response, HostResponse::Result { result: None }));

        let response = service.handle_request(HostRequest::RemovePendingUpload {
            id: "job-1".to_string(),
        });
        assert!(matches!(response, HostResponse::Success { success: true }));
        assert!(service.list_pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_request_duplicate_add_is_error_response() {
        let service = service();
        let job = UploadJob::new(
            "job-1".to_string(),
            "a.txt".to_string(),
            data_url::encode("text/plain", b"a"),
            "tok".to_string(),
            None,
            None,
            chrono::Utc::now().to_rfc3339(),
        );

        let first = service.handle_request(HostRequest::AddPendingUpload {
            upload: job.clone(),
        });
        assert!(matches!(first, HostResponse::Success { .. }));

        let second = service.handle_request(HostRequest::AddPendingUpload { upload: job });
        match second {
            HostResponse::Error { error } => assert!(error.contains("DuplicateId")),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remove_upload_tolerates_missing() {
        let service = service();
        assert!(!service.remove_upload("missing").unwrap());
    }

    #[tokio::test]
    async fn test_settings_and_metrics_accessors() {
        let service = service();

        let mut settings = service.get_settings().unwrap();
        settings.retention_days = 14;
        service.update_settings(settings).unwrap();
        assert_eq!(service.get_settings().unwrap().retention_days, 14);

        service
            .enqueue("a.txt", "text/plain", b"a", "tok", None, None)
            .unwrap();
        assert_eq!(service.get_metrics().uploads_enqueued, 1);

        // TTL 0 は何も消さない
        assert_eq!(service.cleanup_old_data(0).unwrap(), (0, 0));
    }
}
