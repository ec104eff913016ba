use crate::config::AppConfig;
use crate::core::pacing::Pacer;
use crate::core::sequencer::{BookingOutcome, BookingSequencer};
use crate::domain::model::{BookingRequest, BrowserProfile, JobSubmission, ResolvedBooking};
use crate::domain::ports::{DriverFactory, ServiceResolver, Storage};
use crate::utils::error::{BookingError, Result};
use crate::utils::logger::RunLog;
use crate::utils::validation::Validate;
use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::Instant;

/// 已結束的工作在登記表中保留多久
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// 整個流程失敗後的重試策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running { attempt: u32 },
    Succeeded { screenshot: String, attempts: u32 },
    Failed { error: String, attempts: u32 },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Succeeded { .. } | JobStatus::Failed { .. })
    }
}

#[derive(Debug, Clone)]
struct JobEntry {
    status: JobStatus,
    finished_at: Option<Instant>,
}

/// 各工作的目前狀態
///
/// 結束超過保留時間的工作會在登記新工作時移除，未結束的工作一律保留。
#[derive(Debug, Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, JobEntry>>>,
    retention: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_JOB_RETENTION)
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// 以 `base` 為執行編號登記新工作，重複時加上 `-2`、`-3` ...
    pub async fn reserve(&self, base: &str) -> String {
        let mut jobs = self.jobs.write().await;

        let before = jobs.len();
        let retention = self.retention;
        jobs.retain(|_, entry| {
            entry
                .finished_at
                .map_or(true, |finished| finished.elapsed() < retention)
        });
        if jobs.len() < before {
            tracing::debug!("Evicted {} finished job(s)", before - jobs.len());
        }

        let mut run_id = base.to_string();
        let mut suffix = 2;
        while jobs.contains_key(&run_id) {
            run_id = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        jobs.insert(
            run_id.clone(),
            JobEntry {
                status: JobStatus::Queued,
                finished_at: None,
            },
        );
        run_id
    }

    pub async fn set(&self, run_id: &str, status: JobStatus) {
        let finished_at = status.is_finished().then(Instant::now);
        self.jobs
            .write()
            .await
            .insert(run_id.to_string(), JobEntry { status, finished_at });
    }

    pub async fn get(&self, run_id: &str) -> Option<JobStatus> {
        self.jobs
            .read()
            .await
            .get(run_id)
            .map(|entry| entry.status.clone())
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

/// 成功執行的摘要
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub screenshot_path: String,
    pub attempts: u32,
    pub services_selected: usize,
}

/// 以本地時間產生執行編號，例如 `20250612-101500`
pub fn run_timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// 接受預約工作的佇列，HTTP 入口只依賴這個介面
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, request: BookingRequest, profile: BrowserProfile) -> String;
    async fn status(&self, run_id: &str) -> Option<JobStatus>;
}

pub struct JobRunner<R, F, S>
where
    R: ServiceResolver,
    F: DriverFactory,
    S: Storage,
{
    resolver: R,
    factory: F,
    storage: S,
    base_url: String,
    pacer: Pacer,
    policy: RetryPolicy,
    logs_dir: Option<PathBuf>,
    registry: JobRegistry,
    permits: Arc<Semaphore>,
}

impl<R, F, S> JobRunner<R, F, S>
where
    R: ServiceResolver,
    F: DriverFactory,
    S: Storage,
{
    pub fn new(resolver: R, factory: F, storage: S, base_url: impl Into<String>) -> Self {
        Self {
            resolver,
            factory,
            storage,
            base_url: base_url.into(),
            pacer: Pacer::new(Default::default()),
            policy: RetryPolicy::default(),
            logs_dir: None,
            registry: JobRegistry::new(),
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// 依設定檔建立執行器
    pub fn from_config(config: &AppConfig, resolver: R, factory: F, storage: S) -> Self {
        Self::new(resolver, factory, storage, config.site.base_url.clone())
            .with_pacer(Pacer::new(config.timing.clone()))
            .with_retry_policy(RetryPolicy {
                max_retries: config.runner.max_retries,
                delay: config.retry_delay(),
            })
            .with_logs_dir(&config.output.logs_dir)
            .with_max_concurrent_runs(config.runner.max_concurrent_runs)
            .with_job_retention(config.job_retention())
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 每次執行的日誌檔目錄；未設定時日誌只保留在記憶體
    pub fn with_logs_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(logs_dir.into());
        self
    }

    /// 已結束工作在登記表中的保留時間
    pub fn with_job_retention(mut self, retention: Duration) -> Self {
        self.registry = JobRegistry::with_retention(retention);
        self
    }

    pub fn with_max_concurrent_runs(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// 執行一個工作，含重試；日誌寫入該次執行的日誌檔
    pub async fn execute(&self, submission: JobSubmission) -> Result<RunReport> {
        let log = match &self.logs_dir {
            Some(dir) => RunLog::create(dir, &submission.run_id)?,
            None => RunLog::in_memory(&submission.run_id),
        };
        self.execute_with_log(submission, &log).await
    }

    pub async fn execute_with_log(
        &self,
        submission: JobSubmission,
        log: &RunLog,
    ) -> Result<RunReport> {
        let run_id = submission.run_id.clone();
        let result = self.execute_inner(submission, log).await;

        match &result {
            Ok(report) => {
                self.registry
                    .set(
                        &run_id,
                        JobStatus::Succeeded {
                            screenshot: report.screenshot_path.clone(),
                            attempts: report.attempts,
                        },
                    )
                    .await
            }
            Err((e, attempts)) => {
                self.registry
                    .set(
                        &run_id,
                        JobStatus::Failed {
                            error: e.to_string(),
                            attempts: *attempts,
                        },
                    )
                    .await
            }
        }

        result.map_err(|(e, _)| e)
    }

    async fn execute_inner(
        &self,
        submission: JobSubmission,
        log: &RunLog,
    ) -> std::result::Result<RunReport, (BookingError, u32)> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            let e = BookingError::ConfigError {
                message: "job runner is shutting down".to_string(),
            };
            (e, 0)
        })?;

        log.info(format!(
            "Booking started with {} browser: {}",
            submission.profile,
            serde_json::to_string(&submission.request).unwrap_or_default()
        ));

        submission.request.validate().map_err(|e| (e, 0))?;
        let booking = self.resolve(submission.request, log).map_err(|e| (e, 0))?;

        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;
        loop {
            self.registry
                .set(&submission.run_id, JobStatus::Running { attempt })
                .await;
            log.info(format!("Attempt {}/{}", attempt, max_attempts));

            match self
                .attempt(&booking, submission.profile, &submission.run_id, log)
                .await
            {
                Ok((screenshot_path, outcome)) => {
                    log.info(format!("Screenshot saved to {}", screenshot_path));
                    return Ok(RunReport {
                        run_id: submission.run_id,
                        screenshot_path,
                        attempts: attempt,
                        services_selected: outcome.services_selected,
                    });
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    log.warn(format!(
                        "Attempt {} failed: {}. Restarting from branch selection in {:?}",
                        attempt, e, self.policy.delay
                    ));
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log.error(format!("Booking failed after {} attempt(s): {}", attempt, e));
                    return Err((e, attempt));
                }
            }
        }
    }

    /// 在開啟瀏覽器之前把 FleetLink ID 轉成服務清單
    fn resolve(&self, request: BookingRequest, log: &RunLog) -> Result<ResolvedBooking> {
        log.info(format!("FleetLink ID : {:?}", request.identifiers));
        let services = self.resolver.resolve(&request.unique_identifiers());

        if services.is_empty() {
            log.error(format!(
                "Service not found for FleetLink ID: {:?}",
                request.identifiers
            ));
        }
        for service in &services {
            log.info(format!(
                "Service Gruppe: {:<20} | ATU Service: {}",
                service.group, service.name
            ));
        }

        ResolvedBooking::new(request, services)
    }

    /// 單次嘗試：開啟瀏覽器、跑完所有階段，無論成敗都關閉瀏覽器
    async fn attempt(
        &self,
        booking: &ResolvedBooking,
        profile: BrowserProfile,
        run_id: &str,
        log: &RunLog,
    ) -> Result<(String, BookingOutcome)> {
        let mut driver = self.factory.launch(profile).await?;
        log.info(format!("Browser Type: {}", profile));

        let result = BookingSequencer::new(
            driver.as_mut(),
            booking,
            &self.base_url,
            &self.pacer,
            log,
        )
        .run()
        .await;

        if let Err(e) = driver.close().await {
            log.warn(format!("Failed to close browser session: {}", e));
        }

        let outcome = result?;
        let path = self
            .storage
            .write_file(&format!("{}.png", run_id), &outcome.screenshot)
            .await?;
        Ok((path, outcome))
    }
}

impl<R, F, S> JobRunner<R, F, S>
where
    R: ServiceResolver + 'static,
    F: DriverFactory + 'static,
    S: Storage + 'static,
{
    /// 登記並在背景執行工作，立即回傳執行編號
    pub async fn submit(self: &Arc<Self>, request: BookingRequest, profile: BrowserProfile) -> String {
        let run_id = self.registry.reserve(&run_timestamp()).await;
        let submission = JobSubmission {
            run_id: run_id.clone(),
            request,
            profile,
        };

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let run_id = submission.run_id.clone();
            match runner.execute(submission).await {
                Ok(report) => tracing::info!(
                    "✅ Booking {} completed after {} attempt(s)",
                    run_id,
                    report.attempts
                ),
                Err(e) => tracing::error!("❌ Booking {} failed: {}", run_id, e),
            }
        });

        run_id
    }
}

#[async_trait]
impl<R, F, S> JobQueue for Arc<JobRunner<R, F, S>>
where
    R: ServiceResolver + 'static,
    F: DriverFactory + 'static,
    S: Storage + 'static,
{
    async fn enqueue(&self, request: BookingRequest, profile: BrowserProfile) -> String {
        self.submit(request, profile).await
    }

    async fn status(&self, run_id: &str) -> Option<JobStatus> {
        self.registry.get(run_id).await
    }
}
