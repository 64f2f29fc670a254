use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PRIORITY: i32 = 8;
pub const DEFAULT_QPS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Processing,
    Processed,
    Failed,
    WaitingSub,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Processing => "Processing",
            TaskStatus::Processed => "Processed",
            TaskStatus::Failed => "Failed",
            TaskStatus::WaitingSub => "WaitingSub",
        }
    }
}

/// One unit of schedulable work. Mirrors `internal/scheduler/task.go`'s
/// `Task` struct field-for-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub queue_key: String,
    pub parent_task_id: Option<String>,
    pub source_task_id: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub status: TaskStatus,
    pub max_retries: u32,
    pub current_retry: u32,
    pub timeout: Duration,
    pub dependencies: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Cleared once the task finishes; tracked out-of-band in the
    /// scheduler via an atomic flag for lock-free reads.
    #[serde(skip)]
    pub active: Arc<AtomicBool>,
    #[serde(skip)]
    pub has_sub_task: Arc<AtomicBool>,
}

#[derive(Debug, Default, Clone)]
pub struct TaskOptions {
    pub parent_task_id: Option<String>,
    pub source_task_id: Option<String>,
    pub priority: Option<i32>,
    pub max_retries: Option<u32>,
    pub dependencies: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Task {
    pub fn new(queue_key: &str, payload: serde_json::Value, options: TaskOptions) -> Self {
        let id = format!("{}-{}", queue_key, Uuid::new_v4());
        let source_task_id = match (&options.parent_task_id, &options.source_task_id) {
            (None, None) => id.clone(),
            (_, Some(source)) => source.clone(),
            (Some(parent), None) => parent.clone(),
        };

        Self {
            id,
            queue_key: queue_key.to_string(),
            parent_task_id: options.parent_task_id,
            source_task_id,
            payload,
            priority: options.priority.filter(|p| *p != 0).unwrap_or(DEFAULT_PRIORITY),
            status: TaskStatus::Pending,
            max_retries: options.max_retries.filter(|r| *r != 0).unwrap_or(DEFAULT_MAX_RETRIES),
            current_retry: 0,
            timeout: options.timeout.filter(|t| !t.is_zero()).unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            dependencies: options.dependencies,
            created_at: Utc::now(),
            active: Arc::new(AtomicBool::new(true)),
            has_sub_task: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, TaskStatus::Processed | TaskStatus::Failed)
    }

    pub fn mark_has_sub_task(&self) {
        self.has_sub_task.store(true, Ordering::SeqCst);
    }

    pub fn has_sub_task(&self) -> bool {
        self.has_sub_task.load(Ordering::SeqCst)
    }
}

/// The heap entry wrapping a `Task` with the bookkeeping the priority
/// queue needs. Mirrors `TaskItem` in `internal/scheduler/task.go`.
#[derive(Debug, Clone)]
pub struct TaskItem {
    pub task: Task,
    pub enqueued_at_nanos: i64,
}

impl crate::queue::PriorityItem for TaskItem {
    fn id(&self) -> &str {
        &self.task.id
    }

    fn priority(&self) -> i32 {
        self.task.priority
    }

    fn enqueued_at(&self) -> i64 {
        self.enqueued_at_nanos
    }
}

static NEXT_ENQUEUE_SEQ: AtomicU32 = AtomicU32::new(0);

impl TaskItem {
    pub fn new(task: Task) -> Self {
        // Ties within the same queue are broken by an incrementing
        // sequence rather than wall-clock time, so two tasks enqueued
        // within the same clock tick still order deterministically.
        let enqueued_at_nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0)
            + NEXT_ENQUEUE_SEQ.fetch_add(1, Ordering::Relaxed) as i64;
        Self { task, enqueued_at_nanos }
    }
}

/// A node in the reconstructed parent/child task tree (`GetTaskTree`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    pub task: Task,
    pub children: Vec<TaskNode>,
}

pub fn build_task_tree(tasks: &[Task]) -> Option<TaskNode> {
    let mut children_of: HashMap<String, Vec<Task>> = HashMap::new();
    let mut root: Option<Task> = None;

    for task in tasks {
        match &task.parent_task_id {
            Some(parent) => children_of.entry(parent.clone()).or_default().push(task.clone()),
            None => {
                if root.is_none() {
                    root = Some(task.clone());
                }
            }
        }
    }

    fn attach(task: Task, children_of: &HashMap<String, Vec<Task>>) -> TaskNode {
        let children = children_of
            .get(&task.id)
            .map(|kids| kids.iter().cloned().map(|k| attach(k, children_of)).collect())
            .unwrap_or_default();
        TaskNode { task, children }
    }

    root.map(|r| attach(r, &children_of))
}
