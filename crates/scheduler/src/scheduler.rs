use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use webcore::config::SchedulerConfig;
use webcore::collaborators::{TaskRecord, TaskRecordSink};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SchedulerError};
use crate::queue::PriorityQueue;
use crate::task::{build_task_tree, Task, TaskItem, TaskNode, TaskOptions, TaskStatus};
use crate::worker::Worker;

/// Handles one queue's tasks. Implementations type-assert on
/// `task.payload` the way `internal/scheduler`'s registered handler
/// functions do, returning an error on shape mismatch.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: Task) -> std::result::Result<(), String>;
}

struct QueueState {
    queue: Mutex<PriorityQueue<TaskItem>>,
    workers: RwLock<Vec<Arc<Worker>>>,
    qps: AtomicU32,
    cancel: CancellationToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_key: String,
    pub depth: usize,
    pub worker_count: usize,
    pub active_workers: usize,
    pub qps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub paused: bool,
    pub queues: Vec<QueueStatus>,
    pub total_tasks: usize,
}

struct Inner {
    config: SchedulerConfig,
    queues: RwLock<HashMap<String, Arc<QueueState>>>,
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
    task_index: RwLock<HashMap<String, Task>>,
    paused: AtomicBool,
    cancel: RwLock<CancellationToken>,
    record_sink: Arc<dyn TaskRecordSink>,
    background: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

/// The queue/worker/retry/auto-scale engine (spec §4.3). Starts cancelled
/// — mirrors `internal/scheduler/scheduler.go`'s `New()`, which fills in
/// defaults and then immediately calls `cancel()`; nothing runs until
/// `reset()`.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, record_sink: Arc<dyn TaskRecordSink>) -> Self {
        let token = CancellationToken::new();
        token.cancel();
        let inner = Arc::new(Inner {
            config,
            queues: RwLock::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            task_index: RwLock::new(HashMap::new()),
            paused: AtomicBool::new(false),
            cancel: RwLock::new(token),
            record_sink,
            background: Mutex::new(Vec::new()),
        });
        Self { inner }
    }

    pub async fn register_handler(&self, queue_key: &str, handler: Arc<dyn TaskHandler>) {
        self.inner.handlers.write().await.insert(queue_key.to_string(), handler);
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        // `try_read` is fine here: the cancel token is only ever swapped
        // by `reset`/`shutdown`, never held long.
        self.inner
            .cancel
            .try_read()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }

    /// A cloned handle to the current cancellation token. Cloning (rather
    /// than awaiting `.cancelled()` on a borrowed lock guard) keeps the
    /// token alive for the whole lifetime of a `select!` branch.
    async fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.read().await.clone()
    }

    /// (Re)starts the scheduler: clears all queues/workers/task state and
    /// spawns the auto-scaler and task-state-checker loops. Mirrors
    /// `Scheduler.Reset()`.
    pub async fn reset(&self) {
        self.shutdown_background().await;

        self.inner.queues.write().await.clear();
        self.inner.task_index.write().await.clear();
        self.inner.paused.store(false, Ordering::SeqCst);

        let token = CancellationToken::new();
        *self.inner.cancel.write().await = token;

        let autoscale = self.clone();
        let autoscale_handle = tokio::spawn(async move { autoscale.auto_scaler_loop().await });

        let checker = self.clone();
        let checker_handle = tokio::spawn(async move { checker.task_state_checker_loop().await });

        let mut background = self.inner.background.lock().await;
        background.push(autoscale_handle);
        background.push(checker_handle);

        info!("scheduler reset");
    }

    /// Tears everything down without restarting. Mirrors `Shutdown()`.
    pub async fn shutdown(&self) {
        info!("scheduler shutting down");
        self.inner.cancel.read().await.cancel();

        let queues = self.inner.queues.read().await;
        for queue in queues.values() {
            queue.cancel.cancel();
            for worker in queue.workers.read().await.iter() {
                worker.stop().await;
            }
        }
        drop(queues);

        self.shutdown_background().await;
    }

    async fn shutdown_background(&self) {
        let mut background = self.inner.background.lock().await;
        for handle in background.drain(..) {
            handle.abort();
        }
    }

    async fn queue_state(&self, queue_key: &str) -> Arc<QueueState> {
        if let Some(q) = self.inner.queues.read().await.get(queue_key) {
            return q.clone();
        }
        let mut queues = self.inner.queues.write().await;
        queues
            .entry(queue_key.to_string())
            .or_insert_with(|| {
                let state = Arc::new(QueueState {
                    queue: Mutex::new(PriorityQueue::new()),
                    workers: RwLock::new(Vec::new()),
                    qps: AtomicU32::new(self.inner.config.default_qps),
                    cancel: CancellationToken::new(),
                });
                let scheduler = self.clone();
                let key = queue_key.to_string();
                let dispatcher_state = state.clone();
                tokio::spawn(async move {
                    scheduler.dispatch_loop(key, dispatcher_state).await;
                });
                state
            })
            .clone()
    }

    pub fn set_queue_qps(&self, queue_key: &str, qps: u32) {
        let inner = self.inner.clone();
        let queue_key = queue_key.to_string();
        tokio::spawn(async move {
            let state = {
                let queues = inner.queues.read().await;
                queues.get(&queue_key).cloned()
            };
            if let Some(state) = state {
                state.qps.store(qps, Ordering::SeqCst);
                for worker in state.workers.read().await.iter() {
                    worker.limiter.set_qps(qps);
                }
            }
        });
    }

    pub async fn get_queue_qps(&self, queue_key: &str) -> u32 {
        match self.inner.queues.read().await.get(queue_key) {
            Some(state) => state.qps.load(Ordering::SeqCst),
            None => self.inner.config.default_qps,
        }
    }

    /// Enqueues `task`, after the depth check spec §4.3 requires.
    pub async fn submit_task(&self, mut task: Task) -> Result<()> {
        if self.is_cancelled() {
            return Err(SchedulerError::ShutDown);
        }

        let state = self.queue_state(&task.queue_key).await;
        {
            let queue = state.queue.lock().await;
            if queue.len() >= self.inner.config.max_queue_depth {
                return Err(SchedulerError::QueueFull(task.queue_key.clone()));
            }
        }

        task.status = TaskStatus::Pending;
        let parent_id = task.parent_task_id.clone();

        self.inner.task_index.write().await.insert(task.id.clone(), task.clone());
        state.queue.lock().await.push(TaskItem::new(task));

        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.inner.task_index.write().await.get_mut(&parent_id) {
                parent.mark_has_sub_task();
            }
        }

        Ok(())
    }

    /// Convenience wrapper building a `Task` from options and submitting
    /// it in one call.
    pub async fn submit(&self, queue_key: &str, payload: serde_json::Value, options: TaskOptions) -> Result<String> {
        let task = Task::new(queue_key, payload, options);
        let id = task.id.clone();
        self.submit_task(task).await?;
        Ok(id)
    }

    pub async fn cancel_task(&self, task_id: &str) -> Result<()> {
        let task = self
            .inner
            .task_index
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| SchedulerError::TaskNotFound(task_id.to_string()))?;

        let state = self.queue_state(&task.queue_key).await;
        state.queue.lock().await.remove(task_id);
        self.recursion_delete_task(task_id).await;
        Ok(())
    }

    async fn recursion_delete_task(&self, task_id: &str) {
        let children: Vec<String> = self
            .inner
            .task_index
            .read()
            .await
            .values()
            .filter(|t| t.parent_task_id.as_deref() == Some(task_id))
            .map(|t| t.id.clone())
            .collect();
        for child in children {
            Box::pin(self.recursion_delete_task(&child)).await;
        }
        self.inner.task_index.write().await.remove(task_id);
    }

    async fn dispatch_loop(&self, queue_key: String, state: Arc<QueueState>) {
        let mut tick = time::interval(Duration::from_millis(50));
        loop {
            let global_cancel = self.cancel_token().await;
            tokio::select! {
                _ = state.cancel.cancelled() => return,
                _ = global_cancel.cancelled() => return,
                _ = tick.tick() => {
                    if self.is_paused() {
                        continue;
                    }
                    self.dispatch_ready_tasks(&queue_key, &state).await;
                }
            }
        }
    }

    async fn dispatch_ready_tasks(&self, queue_key: &str, state: &Arc<QueueState>) {
        let workers = state.workers.read().await.clone();
        for worker in workers {
            if !worker.try_activate() {
                continue;
            }
            let next = state.queue.lock().await.pop();
            match next {
                Some(item) => {
                    if worker.task_tx.send(item.task).await.is_err() {
                        worker.deactivate();
                    }
                }
                None => worker.deactivate(),
            }
        }
        let _ = queue_key;
    }

    async fn auto_scaler_loop(&self) {
        let mut tick = time::interval(Duration::from_secs(self.inner.config.auto_scale_interval_secs.max(1)));
        loop {
            let global_cancel = self.cancel_token().await;
            tokio::select! {
                _ = global_cancel.cancelled() => return,
                _ = tick.tick() => {
                    self.adjust_all_queues().await;
                }
            }
        }
    }

    async fn adjust_all_queues(&self) {
        let queue_keys: Vec<String> = self.inner.queues.read().await.keys().cloned().collect();
        for key in queue_keys {
            self.adjust_workers(&key).await;
        }
    }

    /// `ceil(sqrt(depth))`, capped at `max_workers_per_queue`. An empty
    /// queue needs zero workers, not one sitting idle.
    fn calculate_ideal_workers(&self, depth: usize) -> usize {
        let ideal = (depth as f64).sqrt().ceil() as usize;
        ideal.clamp(0, self.inner.config.max_workers_per_queue)
    }

    async fn adjust_workers(&self, queue_key: &str) {
        let state = match self.inner.queues.read().await.get(queue_key).cloned() {
            Some(s) => s,
            None => return,
        };
        let depth = state.queue.lock().await.len();
        let ideal = self.calculate_ideal_workers(depth);
        let current = state.workers.read().await.len();

        if current < ideal {
            self.scale_up(queue_key, &state, ideal - current).await;
        } else if current > ideal {
            self.scale_down(queue_key, &state, current - ideal).await;
        }
    }

    async fn scale_up(&self, queue_key: &str, state: &Arc<QueueState>, count: usize) {
        let qps = state.qps.load(Ordering::SeqCst);
        for _ in 0..count {
            let (worker, _quit_tx) = Worker::new(
                queue_key,
                Duration::from_secs(self.inner.config.worker_idle_timeout_secs),
                qps,
            );
            let worker = Arc::new(worker);
            let task_rx = worker.take_receiver().await.expect("fresh worker has a receiver");

            let scheduler = self.clone();
            let key = queue_key.to_string();
            let run_worker = worker.clone();
            tokio::spawn(async move {
                scheduler.run_worker(key, run_worker, task_rx).await;
            });

            state.workers.write().await.push(worker);
        }
        debug!(queue_key, count, "scaled up");
    }

    async fn scale_down(&self, queue_key: &str, state: &Arc<QueueState>, count: usize) {
        let mut workers = state.workers.write().await;
        let mut removed = 0;
        let mut keep = Vec::with_capacity(workers.len());
        for worker in workers.drain(..) {
            if removed < count && !worker.is_active() && worker.idle_for() > worker.idle_timeout {
                worker.stop().await;
                removed += 1;
            } else {
                keep.push(worker);
            }
        }
        *workers = keep;
        if removed > 0 {
            debug!(queue_key, removed, "scaled down");
        }
    }

    async fn run_worker(&self, queue_key: String, worker: Arc<Worker>, mut task_rx: mpsc::Receiver<Task>) {
        loop {
            let idle_sleep = time::sleep(worker.idle_timeout);
            tokio::pin!(idle_sleep);
            let global_cancel = self.cancel_token().await;
            tokio::select! {
                _ = global_cancel.cancelled() => return,
                _ = &mut idle_sleep => {
                    if !worker.is_active() {
                        return;
                    }
                }
                maybe_task = task_rx.recv() => {
                    match maybe_task {
                        Some(task) => {
                            worker.limiter.wait().await;
                            self.process_task(&queue_key, task).await;
                            worker.deactivate();
                        }
                        None => return,
                    }
                }
            }
        }
    }

    async fn process_task(&self, queue_key: &str, mut task: Task) {
        task.status = TaskStatus::Processing;
        self.inner.task_index.write().await.insert(task.id.clone(), task.clone());

        let handler = self.inner.handlers.read().await.get(queue_key).cloned();
        let Some(handler) = handler else {
            warn!(queue_key, "no handler registered, failing task");
            self.record_failed(&task.id).await;
            return;
        };

        let timeout = task.timeout;
        let handle_task = task.clone();
        let run = tokio::spawn(async move { handler.handle(handle_task).await });
        let abort_handle = run.abort_handle();

        let outcome = time::timeout(timeout, run).await;
        match outcome {
            Ok(Ok(Ok(()))) => self.record_success(&task.id).await,
            Ok(Ok(Err(err))) => {
                warn!(task_id = %task.id, error = %err, "task handler failed");
                self.record_failed(&task.id).await;
            }
            Ok(Err(join_err)) => {
                error!(task_id = %task.id, error = %join_err, "task handler panicked");
                self.record_failed(&task.id).await;
            }
            Err(_) => {
                warn!(task_id = %task.id, "task handler timed out");
                abort_handle.abort();
                self.record_failed(&task.id).await;
            }
        }
    }

    async fn record_success(&self, task_id: &str) {
        let mut index = self.inner.task_index.write().await;
        if let Some(task) = index.get_mut(task_id) {
            task.status = TaskStatus::Processed;
            task.set_active(false);
        }
    }

    async fn record_failed(&self, task_id: &str) {
        let task = {
            let index = self.inner.task_index.read().await;
            index.get(task_id).cloned()
        };
        let Some(task) = task else { return };

        if task.current_retry < task.max_retries {
            self.retry_task(task).await;
        } else {
            let mut index = self.inner.task_index.write().await;
            if let Some(entry) = index.get_mut(task_id) {
                entry.status = TaskStatus::Failed;
                entry.set_active(false);
            }
        }
    }

    /// Sleeps `BaseRetryDelay * 2^current_retry`, then resubmits. Mirrors
    /// `retryTask` in `internal/scheduler/scheduler.go`.
    async fn retry_task(&self, mut task: Task) {
        task.current_retry += 1;
        let delay = Duration::from_secs(self.inner.config.base_retry_delay_secs) * 2u32.pow(task.current_retry.min(16));
        let scheduler = self.clone();
        tokio::spawn(async move {
            time::sleep(delay).await;
            task.status = TaskStatus::Pending;
            if let Err(err) = scheduler.submit_task(task).await {
                warn!(error = %err, "retry resubmission failed");
            }
        });
    }

    /// 1s ticker reconciling finished-with-no-active-subtasks state.
    /// Mirrors `taskStateChecker`/`checkTaskStates`.
    async fn task_state_checker_loop(&self) {
        let mut tick = time::interval(Duration::from_secs(1));
        loop {
            let global_cancel = self.cancel_token().await;
            tokio::select! {
                _ = global_cancel.cancelled() => return,
                _ = tick.tick() => {
                    self.check_task_states().await;
                }
            }
        }
    }

    async fn check_task_states(&self) {
        let tasks: Vec<Task> = self.inner.task_index.read().await.values().cloned().collect();
        for task in tasks {
            if !task.is_finished() {
                continue;
            }
            if self.all_sub_tasks_inactive(&task.id).await {
                task.set_active(false);
                if task.parent_task_id.is_none() {
                    self.recursion_delete_task(&task.id).await;
                } else {
                    self.update_parent_task(&task).await;
                }
            }
        }
    }

    async fn all_sub_tasks_inactive(&self, task_id: &str) -> bool {
        let index = self.inner.task_index.read().await;
        !index
            .values()
            .any(|t| t.parent_task_id.as_deref() == Some(task_id) && t.is_active())
    }

    async fn update_parent_task(&self, task: &Task) {
        let Some(parent_id) = &task.parent_task_id else { return };
        let index = self.inner.task_index.read().await;
        if let Some(parent) = index.get(parent_id) {
            if parent.is_finished() {
                let parent = parent.clone();
                drop(index);
                if self.all_sub_tasks_inactive(parent_id).await {
                    parent.set_active(false);
                }
            }
        }
    }

    /// Polls every second until every queue is empty and the task index is
    /// clear, mirroring `WaitUntilEmpty`.
    pub async fn wait_until_empty(&self) {
        let mut tick = time::interval(Duration::from_secs(1));
        loop {
            tick.tick().await;
            if self.is_cancelled() {
                return;
            }
            let queues = self.inner.queues.read().await;
            let mut total_depth = 0;
            for q in queues.values() {
                total_depth += q.queue.lock().await.len();
            }
            drop(queues);
            let index_empty = self.inner.task_index.read().await.is_empty();
            if total_depth == 0 && index_empty {
                return;
            }
        }
    }

    pub async fn get_task_tree(&self, root_task_id: &str) -> Option<TaskNode> {
        let tasks: Vec<Task> = self.inner.task_index.read().await.values().cloned().collect();
        let related: Vec<Task> = tasks
            .iter()
            .filter(|t| t.id == root_task_id || t.source_task_id == root_task_id)
            .cloned()
            .map(|t| self.with_derived_status(t, &tasks))
            .collect();
        build_task_tree(&related)
    }

    /// `WaitingSub` isn't a status anything ever assigns — it's a label
    /// derived at read time for a finished task that's still waiting on
    /// active children, so `is_finished()` and the retry/state-checker
    /// logic that depend on the real `Processed`/`Failed` status keep
    /// working untouched.
    fn with_derived_status(&self, mut task: Task, all: &[Task]) -> Task {
        if task.is_finished()
            && task.has_sub_task()
            && all.iter().any(|t| t.parent_task_id.as_deref() == Some(task.id.as_str()) && t.is_active())
        {
            task.status = TaskStatus::WaitingSub;
        }
        task
    }

    pub async fn status(&self) -> SchedulerStatus {
        let queues = self.inner.queues.read().await;
        let mut statuses = Vec::with_capacity(queues.len());
        let mut total = 0;
        for (key, state) in queues.iter() {
            let depth = state.queue.lock().await.len();
            total += depth;
            let workers = state.workers.read().await;
            let active = workers.iter().filter(|w| w.is_active()).count();
            statuses.push(QueueStatus {
                queue_key: key.clone(),
                depth,
                worker_count: workers.len(),
                active_workers: active,
                qps: state.qps.load(Ordering::SeqCst),
            });
        }
        SchedulerStatus { paused: self.is_paused(), queues: statuses, total_tasks: total }
    }

    /// Persists a `TaskRecord` upsert the way `SubmitJob` does after
    /// handing a task to the scheduler.
    pub async fn persist_record(&self, record: TaskRecord) {
        if let Err(err) = self.inner.record_sink.upsert(record).await {
            warn!(error = %err, "task record persistence failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcore::collaborators::NullTaskRecordSink;
    use std::sync::atomic::AtomicUsize;

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            max_workers_per_queue: 5,
            worker_idle_timeout_secs: 1,
            auto_scale_interval_secs: 1,
            max_queue_depth: 100,
            base_retry_delay_secs: 1,
            default_qps: 600,
        }
    }

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        fail_until: usize,
    }

    #[async_trait]
    impl TaskHandler for CountingHandler {
        async fn handle(&self, _task: Task) -> std::result::Result<(), String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.fail_until {
                Err("synthetic failure".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn submits_and_processes_a_task() {
        let scheduler = Scheduler::new(test_config(), Arc::new(NullTaskRecordSink));
        scheduler.reset().await;

        let calls = Arc::new(AtomicUsize::new(0));
        scheduler
            .register_handler("demo:search", Arc::new(CountingHandler { calls: calls.clone(), fail_until: 0 }))
            .await;

        scheduler
            .submit("demo:search", serde_json::json!({"q": "rust"}), TaskOptions::default())
            .await
            .unwrap();

        time::advance(Duration::from_secs(3)).await;
        scheduler.wait_until_empty().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_failed_tasks_with_backoff() {
        let scheduler = Scheduler::new(test_config(), Arc::new(NullTaskRecordSink));
        scheduler.reset().await;

        let calls = Arc::new(AtomicUsize::new(0));
        scheduler
            .register_handler("demo:retry", Arc::new(CountingHandler { calls: calls.clone(), fail_until: 2 }))
            .await;

        scheduler
            .submit("demo:retry", serde_json::json!({}), TaskOptions::default())
            .await
            .unwrap();

        time::advance(Duration::from_secs(10)).await;
        scheduler.wait_until_empty().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_task_with_active_child_reports_waiting_sub() {
        let scheduler = Scheduler::new(test_config(), Arc::new(NullTaskRecordSink));
        scheduler.reset().await;

        let parent_id = scheduler.submit("demo:search", serde_json::json!({}), TaskOptions::default()).await.unwrap();
        {
            let mut index = scheduler.inner.task_index.write().await;
            let parent = index.get_mut(&parent_id).unwrap();
            parent.status = TaskStatus::Processed;
        }

        let child_options = TaskOptions { parent_task_id: Some(parent_id.clone()), ..Default::default() };
        scheduler.submit("demo:search", serde_json::json!({}), child_options).await.unwrap();

        let tree = scheduler.get_task_tree(&parent_id).await.unwrap();
        assert_eq!(tree.task.status, TaskStatus::WaitingSub);
    }

    #[test]
    fn ideal_worker_count_is_ceil_sqrt_capped() {
        let scheduler = Scheduler::new(test_config(), Arc::new(NullTaskRecordSink));
        assert_eq!(scheduler.calculate_ideal_workers(0), 0);
        assert_eq!(scheduler.calculate_ideal_workers(1), 1);
        assert_eq!(scheduler.calculate_ideal_workers(10), 4);
        assert_eq!(scheduler.calculate_ideal_workers(1000), 5);
    }
}
