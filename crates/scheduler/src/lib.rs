pub mod error;
pub mod queue;
pub mod scheduler;
pub mod task;
pub mod worker;

pub use error::{Result, SchedulerError};
pub use queue::{PriorityItem, PriorityQueue};
pub use scheduler::{QueueStatus, Scheduler, SchedulerStatus, TaskHandler};
pub use task::{
    build_task_tree, Task, TaskItem, TaskNode, TaskOptions, TaskStatus, DEFAULT_MAX_RETRIES,
    DEFAULT_PRIORITY, DEFAULT_QPS, DEFAULT_TIMEOUT_SECS,
};
pub use worker::{RateLimiter, Worker};
