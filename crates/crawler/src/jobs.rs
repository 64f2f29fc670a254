use chrono::Utc;
use webcore::collaborators::TaskRecord;

use scheduler::{Scheduler, TaskOptions};

/// Wraps `Scheduler::submit` with the `CrawlTask` upsert the original's
/// `SubmitJob` performs right after handing a task to the scheduler.
pub struct JobSubmitter {
    scheduler: Scheduler,
}

impl JobSubmitter {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Submits `payload` onto `"<media_code>:<task_type>"` and persists a
    /// `TaskRecord` upsert for it, status `"Running"`.
    pub async fn submit_job(
        &self,
        media_code: &str,
        task_type: &str,
        payload: serde_json::Value,
        options: TaskOptions,
    ) -> scheduler::Result<String> {
        let queue_key = format!("{media_code}:{task_type}");
        let task_id = self.scheduler.submit(&queue_key, payload.clone(), options).await?;
        self.scheduler
            .persist_record(TaskRecord { task_id: task_id.clone(), queue_key, status: "Running".to_string(), payload, updated_at: Utc::now() })
            .await;
        Ok(task_id)
    }
}
