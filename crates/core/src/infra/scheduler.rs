use tokio::sync::mpsc;

use crate::domain::error::AppError;

/// ドレイン契機
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainTrigger {
    /// ホストからの明示的な要求
    Manual,
    /// ネットワーク復帰
    OnlineRestored,
}

/// プラットフォームの遅延実行シグナルの抽象。
/// Host Bridge はこの trait 越しに Orchestrator の起動を予約する
pub trait DrainScheduler: Send + Sync {
    /// バックグラウンド実行が利用可能か
    fn supported(&self) -> bool;

    /// 次の機会に Orchestrator を起動するよう依頼する
    fn schedule(&self, trigger: DrainTrigger) -> Result<(), AppError>;
}

/// Tokio タスクとして動く Orchestrator への channel アダプタ
pub struct TokioDrainScheduler {
    trigger_tx: mpsc::UnboundedSender<DrainTrigger>,
}

impl TokioDrainScheduler {
    pub fn new(trigger_tx: mpsc::UnboundedSender<DrainTrigger>) -> Self {
        Self { trigger_tx }
    }
}

impl DrainScheduler for TokioDrainScheduler {
    fn supported(&self) -> bool {
        true
    }

    fn schedule(&self, trigger: DrainTrigger) -> Result<(), AppError> {
        self.trigger_tx
            .send(trigger)
            .map_err(|_| AppError::internal("Orchestrator タスクが停止しています"))
    }
}

/// バックグラウンド実行を持たない環境用。
/// Host Bridge はこのアダプタを検出すると unsupported 状態で確定し、
/// 呼び出し側はフォアグラウンドの drain_now にフォールバックする
pub struct UnsupportedScheduler;

impl DrainScheduler for UnsupportedScheduler {
    fn supported(&self) -> bool {
        false
    }

    fn schedule(&self, _trigger: DrainTrigger) -> Result<(), AppError> {
        Err(AppError::unsupported(
            "バックグラウンド実行はこの環境では利用できません",
        ))
    }
}
