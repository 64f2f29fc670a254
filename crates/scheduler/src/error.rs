use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("queue {0} is at max depth")]
    QueueFull(String),

    #[error("no handler registered for queue {0}")]
    NoHandler(String),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("scheduler is shut down")]
    ShutDown,

    #[error("handler panicked while processing task {0}")]
    HandlerPanicked(String),

    #[error("handler timed out processing task {0}")]
    HandlerTimedOut(String),

    #[error("handler failed: {0}")]
    HandlerFailed(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
