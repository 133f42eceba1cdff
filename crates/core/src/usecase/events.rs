use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::domain::message::UploadEvent;

/// イベントハブ: Orchestrator の通知を購読中の全リスナーへ配送する。
/// 購読者ごとに独立した channel を持ち、全員が全イベントを受け取る
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<UploadEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// 新しい購読チャネルを返す
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UploadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// 全購読者へ送信する。切断済みの購読者はここで除去される
    pub fn emit(&self, event: UploadEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
