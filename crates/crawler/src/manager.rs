use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use webcore::collaborators::DataSink;
use webcore::{CrawlEndCode, CrawlEndEvent, CrawlStartEvent, EventBus, EventData, RuntimeData};

use scheduler::{Scheduler, Task, TaskHandler, TaskOptions};
use session::{Session, SessionManager, SessionParams};

use crate::error::{CrawlerError, Result};
use crate::jobs::JobSubmitter;
use crate::params::{CommentParams, CrawlParams, CrawlType, MediaParams, SearchParams, UserParams};
use crate::traits::{Crawler, FetchItem, FetchPayload};

/// Caps how many times the round-driver resubmits the root payloads and
/// waits for the queues to drain before giving up. Mirrors the original
/// kernel's `ROUND_MAX`.
pub const ROUND_MAX: u32 = 10;

/// How long the round-driver sleeps between rounds. Mirrors `ROUND_SLEEP`.
pub const ROUND_SLEEP: Duration = Duration::from_secs(20);

/// Fan-out channel capacity (spec §5: "cap 1000").
const CHANNEL_CAPACITY: usize = 1000;

fn session_params(params: &CrawlParams, user_id: Option<String>) -> SessionParams {
    SessionParams { media_code: params.media_code.clone(), region: params.region.clone(), account_type: 0, user_id, keep_alive: true, allow_none_account: true }
}

/// Shared state threaded through every per-run task handler and the
/// fan-out channel consumers. One `RunContext` lives for exactly one
/// `CrawlerManager::run` invocation.
struct RunContext {
    crawler: Arc<dyn Crawler>,
    sessions: Arc<SessionManager>,
    submitter: JobSubmitter,
    params: CrawlParams,
    media_tx: mpsc::Sender<FetchItem>,
    comment_tx: mpsc::Sender<FetchItem>,
    user_tx: mpsc::Sender<FetchItem>,
    data_sink: Arc<dyn DataSink>,
    bus: Arc<EventBus>,
}

struct SearchHandler {
    ctx: Arc<RunContext>,
}

#[async_trait]
impl TaskHandler for SearchHandler {
    async fn handle(&self, task: Task) -> std::result::Result<(), String> {
        let params: SearchParams = serde_json::from_value(task.payload.clone()).map_err(|err| err.to_string())?;
        let session = self.ctx.sessions.get_session(session_params(&self.ctx.params, None)).await.map_err(|err| err.to_string())?;

        let outcome = self.ctx.crawler.fetch_search(&session, &self.ctx.media_tx, &task.id, &task.source_task_id, &params).await;
        self.ctx.sessions.release_session(session).await;
        let outcome = outcome.map_err(|err| err.to_string())?;

        if outcome.verification_required && outcome.result_count == 0 {
            return Err("verification required with zero results".to_string());
        }

        if outcome.has_more && params.page + 1 < self.ctx.params.max_page() {
            let next = SearchParams { keyword: params.keyword.clone(), page: params.page + 1, cursor: outcome.next_cursor };
            let options = TaskOptions { parent_task_id: Some(task.id.clone()), source_task_id: Some(task.source_task_id.clone()), ..Default::default() };
            self.ctx
                .submitter
                .submit_job(&self.ctx.params.media_code, "search", serde_json::to_value(&next).expect("SearchParams serializes"), options)
                .await
                .map_err(|err| err.to_string())?;
        }
        Ok(())
    }
}

struct MediaHandler {
    ctx: Arc<RunContext>,
}

#[async_trait]
impl TaskHandler for MediaHandler {
    async fn handle(&self, task: Task) -> std::result::Result<(), String> {
        let params: MediaParams = serde_json::from_value(task.payload.clone()).map_err(|err| err.to_string())?;
        let session = self.ctx.sessions.get_session(session_params(&self.ctx.params, None)).await.map_err(|err| err.to_string())?;

        let outcome = self.ctx.crawler.fetch_media(&session, &self.ctx.media_tx, &task.id, &task.source_task_id, &params).await;
        self.ctx.sessions.release_session(session).await;
        outcome.map_err(|err| err.to_string())
    }
}

struct UserHandler {
    ctx: Arc<RunContext>,
}

#[async_trait]
impl TaskHandler for UserHandler {
    async fn handle(&self, task: Task) -> std::result::Result<(), String> {
        let params: UserParams = serde_json::from_value(task.payload.clone()).map_err(|err| err.to_string())?;
        let session = self.ctx.sessions.get_session(session_params(&self.ctx.params, Some(params.user_id.clone()))).await.map_err(|err| err.to_string())?;

        let outcome = self.ctx.crawler.fetch_user(&session, &self.ctx.user_tx, &task.id, &task.source_task_id, &params).await;
        self.ctx.sessions.release_session(session).await;
        outcome.map_err(|err| err.to_string())
    }
}

struct CommentHandler {
    ctx: Arc<RunContext>,
}

#[async_trait]
impl TaskHandler for CommentHandler {
    async fn handle(&self, task: Task) -> std::result::Result<(), String> {
        let params: CommentParams = serde_json::from_value(task.payload.clone()).map_err(|err| err.to_string())?;
        let session = self.ctx.sessions.get_session(session_params(&self.ctx.params, None)).await.map_err(|err| err.to_string())?;

        let outcome = self.ctx.crawler.fetch_comment(&session, &self.ctx.comment_tx, &task.id, &task.source_task_id, &params).await;
        self.ctx.sessions.release_session(session).await;
        let outcome = outcome.map_err(|err| err.to_string())?;

        // The original's open question: an empty first page is treated as
        // a global "account over its daily limit" terminator, not just a
        // per-account retry signal.
        if params.cursor == 0 && outcome.result_count == 0 {
            self.ctx
                .bus
                .publish(CrawlEndEvent::new(self.ctx.params.media_code.clone(), CrawlEndCode::OverdLimit, "comment fetch returned nothing at cursor 0"))
                .await;
            return Err("comment fetch overlimit at cursor 0".to_string());
        }

        if outcome.has_more {
            let next = CommentParams { media_id: params.media_id.clone(), cursor: outcome.next_cursor };
            let options = TaskOptions { parent_task_id: Some(task.id.clone()), source_task_id: Some(task.source_task_id.clone()), ..Default::default() };
            self.ctx
                .submitter
                .submit_job(&self.ctx.params.media_code, "comment", serde_json::to_value(&next).expect("CommentParams serializes"), options)
                .await
                .map_err(|err| err.to_string())?;
        }
        Ok(())
    }
}

/// Reacts to one fetched record: decides which sub-tasks it triggers and
/// hands it to the data sink. Mirrors the original's `HandleChannel`.
async fn handle_channel(ctx: &RunContext, item: FetchItem) {
    match item.payload {
        FetchPayload::Media { media, with_user, with_comment, comment_count } => {
            if with_user {
                if let Some(user_id) = media.get("user_id").and_then(|v| v.as_str()) {
                    let options = TaskOptions { source_task_id: Some(item.source_task_id.clone()), ..Default::default() };
                    let payload = serde_json::to_value(&UserParams { user_id: user_id.to_string() }).expect("UserParams serializes");
                    if let Err(err) = ctx.submitter.submit_job(&ctx.params.media_code, "user", payload, options).await {
                        warn!(%err, "failed to submit user sub-task from media");
                    }
                }
            }
            if with_comment && comment_count >= 5 {
                if let Some(media_id) = media.get("id").and_then(|v| v.as_str()) {
                    let options = TaskOptions { source_task_id: Some(item.source_task_id.clone()), ..Default::default() };
                    let payload = serde_json::to_value(&CommentParams { media_id: media_id.to_string(), cursor: 0 }).expect("CommentParams serializes");
                    if let Err(err) = ctx.submitter.submit_job(&ctx.params.media_code, "comment", payload, options).await {
                        warn!(%err, "failed to submit comment sub-task from media");
                    }
                }
            }
            let sink = ctx.data_sink.clone();
            let task_id = item.task_id.clone();
            tokio::spawn(async move {
                if let Err(err) = sink.save_media(&task_id, media).await {
                    warn!(%err, "failed to save media record");
                }
            });
        }
        FetchPayload::Comment { comment, with_comment_user } => {
            let text_empty = comment.get("text").and_then(|v| v.as_str()).map(str::is_empty).unwrap_or(true);
            if text_empty {
                return;
            }
            if with_comment_user {
                if let Some(user_id) = comment.get("user_id").and_then(|v| v.as_str()) {
                    let options = TaskOptions { source_task_id: Some(item.source_task_id.clone()), ..Default::default() };
                    let payload = serde_json::to_value(&UserParams { user_id: user_id.to_string() }).expect("UserParams serializes");
                    if let Err(err) = ctx.submitter.submit_job(&ctx.params.media_code, "user", payload, options).await {
                        warn!(%err, "failed to submit user sub-task from comment");
                    }
                }
            }
            ctx.bus.publish(RuntimeData::new("crawl", EventData::Message(format!("comment captured under {}", item.source_task_id)))).await;
            let sink = ctx.data_sink.clone();
            let task_id = item.task_id.clone();
            tokio::spawn(async move {
                if let Err(err) = sink.save_comment(&task_id, comment).await {
                    warn!(%err, "failed to save comment record");
                }
            });
        }
        FetchPayload::User { user } => {
            let sink = ctx.data_sink.clone();
            let task_id = item.task_id.clone();
            tokio::spawn(async move {
                if let Err(err) = sink.save_user(&task_id, user).await {
                    warn!(%err, "failed to save user record");
                }
            });
        }
    }
}

fn spawn_channel_consumer(ctx: Arc<RunContext>, mut rx: mpsc::Receiver<FetchItem>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            handle_channel(&ctx, item).await;
        }
    })
}

/// Drives one crawl run end to end: resets the scheduler, wires fan-out
/// channels and per-queue handlers for the target media, submits the root
/// tasks derived from `CrawlParams`, and retries whole rounds up to
/// `ROUND_MAX` times on a recoverable end code. Grounded on the original
/// kernel's `Run`/`HandleChannel`/`SubmitJob` trio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlManagerStatus {
    pub running: bool,
    pub last_result: Option<CrawlEndEvent>,
}

pub struct CrawlerManager {
    crawlers: RwLock<HashMap<String, Arc<dyn Crawler>>>,
    sessions: Arc<SessionManager>,
    scheduler: Scheduler,
    data_sink: Arc<dyn DataSink>,
    bus: Arc<EventBus>,
    running: AtomicBool,
    last_result: RwLock<Option<CrawlEndEvent>>,
}

impl CrawlerManager {
    pub fn new(sessions: Arc<SessionManager>, scheduler: Scheduler, data_sink: Arc<dyn DataSink>, bus: Arc<EventBus>) -> Self {
        Self {
            crawlers: RwLock::new(HashMap::new()),
            sessions,
            scheduler,
            data_sink,
            bus,
            running: AtomicBool::new(false),
            last_result: RwLock::new(None),
        }
    }

    pub async fn status(&self) -> CrawlManagerStatus {
        CrawlManagerStatus { running: self.running.load(Ordering::SeqCst), last_result: self.last_result.read().await.clone() }
    }

    pub async fn register(&self, crawler: Arc<dyn Crawler>) {
        self.crawlers.write().await.insert(crawler.media_code().to_string(), crawler);
    }

    /// Runs `params` to completion: one root task per keyword, fanned out
    /// across recursive sub-tasks, retried across up to `ROUND_MAX` rounds.
    /// Refuses if a run is already in flight, mirroring the original's
    /// reentrancy guard.
    pub async fn run(&self, params: CrawlParams) -> Result<CrawlEndEvent> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CrawlerError::AlreadyRunning);
        }
        let result = self.run_inner(params).await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_inner(&self, params: CrawlParams) -> Result<CrawlEndEvent> {
        let media_code = params.media_code.clone();
        let crawler = self.crawlers.read().await.get(&media_code).cloned().ok_or_else(|| CrawlerError::NoCrawler(media_code.clone()))?;

        self.bus.publish(CrawlStartEvent::new(media_code.clone())).await;
        self.bus.publish(RuntimeData::new("crawl", EventData::CrawlStarted { media_code: media_code.clone() })).await;

        self.scheduler.reset().await;
        self.scheduler.set_queue_qps(&format!("{media_code}:search"), 2);
        self.scheduler.set_queue_qps(&format!("{media_code}:media"), 6);
        self.scheduler.set_queue_qps(&format!("{media_code}:user"), 10);
        self.scheduler.set_queue_qps(&format!("{media_code}:comment"), 6);

        let (media_tx, media_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (comment_tx, comment_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (user_tx, user_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let ctx = Arc::new(RunContext {
            crawler: crawler.clone(),
            sessions: self.sessions.clone(),
            submitter: JobSubmitter::new(self.scheduler.clone()),
            params: params.clone(),
            media_tx,
            comment_tx,
            user_tx,
            data_sink: self.data_sink.clone(),
            bus: self.bus.clone(),
        });

        self.scheduler.register_handler(&format!("{media_code}:search"), Arc::new(SearchHandler { ctx: ctx.clone() })).await;
        self.scheduler.register_handler(&format!("{media_code}:media"), Arc::new(MediaHandler { ctx: ctx.clone() })).await;
        self.scheduler.register_handler(&format!("{media_code}:user"), Arc::new(UserHandler { ctx: ctx.clone() })).await;
        self.scheduler.register_handler(&format!("{media_code}:comment"), Arc::new(CommentHandler { ctx: ctx.clone() })).await;

        let media_consumer = spawn_channel_consumer(ctx.clone(), media_rx);
        let comment_consumer = spawn_channel_consumer(ctx.clone(), comment_rx);
        let user_consumer = spawn_channel_consumer(ctx.clone(), user_rx);

        let mut end_rx = self.bus.subscribe::<CrawlEndEvent>(16).await;

        let mut round = 0u32;
        let terminal = loop {
            round += 1;
            self.submit_root_tasks(&ctx).await?;

            let drained = tokio::select! {
                _ = self.scheduler.wait_until_empty() => None,
                Some(envelope) = end_rx.recv() => envelope.downcast::<CrawlEndEvent>().ok().map(|e| (*e).clone()),
            };

            if let Some(event) = drained {
                break event;
            }

            if round >= ROUND_MAX {
                break CrawlEndEvent::new(media_code.clone(), CrawlEndCode::RoundMaxed, format!("gave up after {round} rounds"));
            }

            info!(media_code = %media_code, round, "round drained cleanly, sleeping before next round");
            tokio::time::sleep(ROUND_SLEEP).await;
        };

        drop(ctx);
        let _ = media_consumer.await;
        let _ = comment_consumer.await;
        let _ = user_consumer.await;

        self.bus.publish(terminal.clone()).await;
        self.bus.publish(RuntimeData::new("crawl", EventData::CrawlEnded { media_code: media_code.clone(), code: terminal.code, message: terminal.message.clone() })).await;
        *self.last_result.write().await = Some(terminal.clone());

        Ok(terminal)
    }

    async fn submit_root_tasks(&self, ctx: &RunContext) -> Result<()> {
        let queue_key = match ctx.params.crawl_type {
            CrawlType::Search => "search",
            CrawlType::Media => "media",
            CrawlType::User => "user",
        };

        for keyword in &ctx.params.keywords {
            let payload = match ctx.params.crawl_type {
                CrawlType::Search => serde_json::to_value(&SearchParams { keyword: keyword.clone(), page: 0, cursor: 0 }).expect("SearchParams serializes"),
                CrawlType::Media => serde_json::to_value(&MediaParams { media_id: keyword.clone() }).expect("MediaParams serializes"),
                CrawlType::User => serde_json::to_value(&UserParams { user_id: keyword.clone() }).expect("UserParams serializes"),
            };
            ctx.submitter.submit_job(&ctx.params.media_code, queue_key, payload, TaskOptions::default()).await?;
        }
        Ok(())
    }
}
