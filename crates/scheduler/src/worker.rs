use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use crate::task::Task;

/// Single-permit token bucket refilling one token every `60s / qps`.
/// Mirrors `golang.org/x/time/rate.NewLimiter(rate.Every(time.Minute /
/// qps), 1)` from `internal/scheduler/worker.go`.
pub struct RateLimiter {
    interval_millis: std::sync::atomic::AtomicU64,
    last_take: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(qps: u32) -> Self {
        let qps = qps.max(1);
        Self {
            interval_millis: std::sync::atomic::AtomicU64::new((60_000.0 / qps as f64) as u64),
            last_take: Mutex::new(Instant::now() - Duration::from_secs(3600)),
        }
    }

    pub fn set_qps(&self, qps: u32) {
        let millis = (60_000.0 / qps.max(1) as f64) as u64;
        self.interval_millis.store(millis, Ordering::SeqCst);
    }

    /// Blocks until a token is available.
    pub async fn wait(&self) {
        let interval = Duration::from_millis(self.interval_millis.load(Ordering::SeqCst));
        let mut last_take = self.last_take.lock().await;
        let now = Instant::now();
        let earliest = *last_take + interval;
        if earliest > now {
            tokio::time::sleep(earliest - now).await;
        }
        *last_take = Instant::now();
    }
}

/// One pooled worker for a queue. Mirrors `internal/scheduler/worker.go`'s
/// `worker` struct.
pub struct Worker {
    pub id: String,
    pub queue_key: String,
    pub task_tx: mpsc::Sender<Task>,
    task_rx: Mutex<Option<mpsc::Receiver<Task>>>,
    quit_tx: Mutex<Option<mpsc::Sender<()>>>,
    active: Arc<AtomicBool>,
    last_active_nanos: Arc<AtomicI64>,
    pub idle_timeout: Duration,
    pub limiter: RateLimiter,
}

impl Worker {
    pub fn new(queue_key: &str, idle_timeout: Duration, qps: u32) -> (Self, mpsc::Sender<()>) {
        let id = format!("{}-{}", queue_key, Utc::now().timestamp_nanos_opt().unwrap_or(0));
        let (task_tx, task_rx) = mpsc::channel(100);
        let (quit_tx, _quit_rx_unused) = mpsc::channel(1);
        let worker = Self {
            id,
            queue_key: queue_key.to_string(),
            task_tx,
            task_rx: Mutex::new(Some(task_rx)),
            quit_tx: Mutex::new(Some(quit_tx.clone())),
            active: Arc::new(AtomicBool::new(false)),
            last_active_nanos: Arc::new(AtomicI64::new(Utc::now().timestamp_nanos_opt().unwrap_or(0))),
            idle_timeout,
            limiter: RateLimiter::new(qps),
        };
        (worker, quit_tx)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Atomic compare-and-swap from idle to active, returning whether this
    /// call won the race (mirrors the dispatcher's `CAS active 0 -> 1`).
    pub fn try_activate(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.last_active_nanos.store(Utc::now().timestamp_nanos_opt().unwrap_or(0), Ordering::SeqCst);
    }

    pub fn idle_for(&self) -> Duration {
        let last = self.last_active_nanos.load(Ordering::SeqCst);
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        Duration::from_nanos((now - last).max(0) as u64)
    }

    pub async fn take_receiver(&self) -> Option<mpsc::Receiver<Task>> {
        self.task_rx.lock().await.take()
    }

    pub async fn stop(&self) {
        if let Some(tx) = self.quit_tx.lock().await.take() {
            let _ = tx.send(()).await;
        }
    }
}
