use serde::Serialize;
use std::sync::Mutex;

/// ローカルメトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    uploads_enqueued: u64,
    uploads_completed: u64,
    uploads_failed: u64,
    drains_run: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（ホストに返す用）
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub uploads_enqueued: u64,
    pub uploads_completed: u64,
    pub uploads_failed: u64,
    pub drains_run: u64,
    pub avg_latency_ms: AvgLatency,
    pub recent_latencies: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub upload: Option<f64>,
    pub drain: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_uploads_enqueued(&self) {
        self.counters.lock().unwrap().uploads_enqueued += 1;
    }

    pub fn inc_uploads_completed(&self) {
        self.counters.lock().unwrap().uploads_completed += 1;
    }

    pub fn inc_uploads_failed(&self) {
        self.counters.lock().unwrap().uploads_failed += 1;
    }

    pub fn inc_drains_run(&self) {
        self.counters.lock().unwrap().drains_run += 1;
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let record = LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock().unwrap();
        latencies.push(record);
        // 最新1000件のみ保持
        if latencies.len() > 1000 {
            let excess = latencies.len() - 1000;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock().unwrap();
        let latencies = self.latencies.lock().unwrap();

        let avg = |phase: &str| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.phase == phase)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        MetricsSummary {
            uploads_enqueued: c.uploads_enqueued,
            uploads_completed: c.uploads_completed,
            uploads_failed: c.uploads_failed,
            drains_run: c.drains_run,
            avg_latency_ms: AvgLatency {
                upload: avg("upload"),
                drain: avg("drain"),
            },
            recent_latencies: recent,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let m = Metrics::new();
        m.inc_uploads_enqueued();
        m.inc_uploads_enqueued();
        m.inc_uploads_completed();
        m.inc_uploads_failed();
        m.inc_drains_run();

        let s = m.summary();
        assert_eq!(s.uploads_enqueued, 2);
        assert_eq!(s.uploads_completed, 1);
        assert_eq!(s.uploads_failed, 1);
        assert_eq!(s.drains_run, 1);
    }

    #[test]
    fn test_latency_recording() {
        let m = Metrics::new();
        m.record_latency("upload", 120);
        m.record_latency("upload", 80);
        m.record_latency("drain", 200);

        let s = m.summary();
        assert!((s.avg_latency_ms.upload.unwrap() - 100.0).abs() < f64::EPSILON);
        assert!((s.avg_latency_ms.drain.unwrap() - 200.0).abs() < f64::EPSILON);
        assert_eq!(s.recent_latencies.len(), 3);
    }

    #[test]
    fn test_latency_cap() {
        let m = Metrics::new();
        for i in 0..1100 {
            m.record_latency("upload", i);
        }
        let s = m.summary();
        assert_eq!(s.recent_latencies.len(), 20);
        // 古い記録から捨てられる
        assert_eq!(s.recent_latencies.first().unwrap().duration_ms, 1099);
    }
}
