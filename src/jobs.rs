//! Recurring status polls for server-side jobs (library scans, downloads).

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::model::content::{DownloadRecord, DownloadSource, ScanProgress};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
    Scan,
    Download,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Scan => write!(f, "scan"),
            JobKind::Download => write!(f, "download"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Complete,
    Failed,
}

/// Latest observation of a job.
#[derive(Clone, Debug, PartialEq)]
pub struct JobStatus {
    pub id: Option<String>,
    pub kind: JobKind,
    /// Percent in `[0, 100]`, `None` while indeterminate.
    pub progress: Option<f64>,
    pub state: JobState,
    pub detail: Option<String>,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Complete | JobState::Failed)
    }
}

/// Identifies a submitted job to the status fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobHandle {
    pub kind: JobKind,
    pub id: Option<String>,
    /// Download ids are only unique per source.
    pub source: Option<DownloadSource>,
}

impl JobHandle {
    pub fn scan() -> Self {
        Self {
            kind: JobKind::Scan,
            id: None,
            source: None,
        }
    }

    pub fn download(source: DownloadSource, id: impl Into<String>) -> Self {
        Self {
            kind: JobKind::Download,
            id: Some(id.into()),
            source: Some(source),
        }
    }
}

pub fn scan_status(progress: &ScanProgress) -> JobStatus {
    let state = if progress.is_complete() {
        JobState::Complete
    } else if progress.total == 0 {
        JobState::Pending
    } else {
        JobState::Running
    };
    let percent = (progress.total > 0)
        .then(|| (progress.scanned as f64 / progress.total as f64 * 100.0).min(100.0));

    JobStatus {
        id: None,
        kind: JobKind::Scan,
        progress: percent,
        state,
        detail: progress.current_file.clone(),
    }
}

/// A download the server does not list yet is still pending.
pub fn download_status(id: &str, record: Option<&DownloadRecord>) -> JobStatus {
    let Some(record) = record else {
        return JobStatus {
            id: Some(id.to_string()),
            kind: JobKind::Download,
            progress: None,
            state: JobState::Pending,
            detail: None,
        };
    };

    let state = match record.status.as_str() {
        "completed" => JobState::Complete,
        "error" => JobState::Failed,
        "" | "pending" | "queued" => JobState::Pending,
        _ => JobState::Running,
    };
    let detail = match state {
        JobState::Failed => record.error.clone(),
        _ => record.filename.clone(),
    };

    JobStatus {
        id: Some(id.to_string()),
        kind: JobKind::Download,
        progress: record.progress.map(|p| p.clamp(0.0, 100.0)),
        state,
        detail,
    }
}

/// When a poll gives up without a terminal status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PollPolicy {
    pub timeout: Option<Duration>,
    /// Consecutive failed fetches tolerated.
    pub max_failures: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    Finished(JobStatus),
    TimedOut,
    GaveUp,
    Cancelled,
    /// `fetch` or `on_complete` panicked.
    Panicked,
}

/// A running poll. Dropping it does not stop the task; call [`PollHandle::cancel`].
pub struct PollHandle {
    job: JobHandle,
    token: CancellationToken,
    status: watch::Receiver<Option<JobStatus>>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn job(&self) -> &JobHandle {
        &self.job
    }

    /// Safe to call any number of times, including after the poll finished.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(job = %self.job.kind, id = ?self.job.id, "Cancelling poll");
            self.token.cancel();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn latest(&self) -> Option<JobStatus> {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<JobStatus>> {
        self.status.clone()
    }

    pub async fn join(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => PollOutcome::Cancelled,
            Err(e) => {
                tracing::error!(job = %self.job.kind, id = ?self.job.id, error = %e, "Poll task panicked");
                PollOutcome::Panicked
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct JobPoller {
    interval: Duration,
    policy: PollPolicy,
}

impl JobPoller {
    pub fn new(interval: Duration, policy: PollPolicy) -> Self {
        Self { interval, policy }
    }

    /// Submit a job and poll it until it reaches a terminal status.
    ///
    /// A failed submit is returned and nothing is spawned. The first fetch
    /// happens one interval after the submit returned. `on_complete` runs
    /// at most once, only for a terminal status.
    pub async fn start<S, SFut, E, F, FFut, C>(
        &self,
        kind: JobKind,
        submit: S,
        fetch: F,
        on_complete: C,
    ) -> Result<PollHandle, E>
    where
        S: FnOnce() -> SFut,
        SFut: Future<Output = Result<JobHandle, E>>,
        F: Fn(JobHandle) -> FFut + Send + 'static,
        FFut: Future<Output = Result<JobStatus, ApiError>> + Send + 'static,
        C: FnOnce(JobStatus) + Send + 'static,
    {
        let job = submit().await?;
        tracing::info!(job = %kind, id = ?job.id, "Job submitted, polling status");

        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(poll_loop(
            job.clone(),
            self.interval,
            self.policy,
            token.clone(),
            tx,
            fetch,
            on_complete,
        ));

        Ok(PollHandle {
            job,
            token,
            status: rx,
            task,
        })
    }
}

async fn poll_loop<F, FFut, C>(
    job: JobHandle,
    interval: Duration,
    policy: PollPolicy,
    token: CancellationToken,
    tx: watch::Sender<Option<JobStatus>>,
    fetch: F,
    on_complete: C,
) -> PollOutcome
where
    F: Fn(JobHandle) -> FFut,
    FFut: Future<Output = Result<JobStatus, ApiError>>,
    C: FnOnce(JobStatus),
{
    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures: u32 = 0;

    loop {
        tokio::select! {
            _ = token.cancelled() => return PollOutcome::Cancelled,
            _ = ticker.tick() => {}
        }

        if let Some(timeout) = policy.timeout {
            if started.elapsed() >= timeout {
                tracing::warn!(job = %job.kind, id = ?job.id, ?timeout, "Job poll timed out");
                token.cancel();
                return PollOutcome::TimedOut;
            }
        }

        let result = tokio::select! {
            _ = token.cancelled() => return PollOutcome::Cancelled,
            result = fetch(job.clone()) => result,
        };

        match result {
            Ok(status) => {
                failures = 0;
                let _ = tx.send(Some(status.clone()));

                if status.is_terminal() {
                    tracing::info!(job = %job.kind, id = ?job.id, state = ?status.state, "Job finished");
                    token.cancel();
                    on_complete(status.clone());
                    return PollOutcome::Finished(status);
                }
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(job = %job.kind, id = ?job.id, error = %e, failures, "Job status poll failed");

                if policy.max_failures.is_some_and(|max| failures >= max) {
                    token.cancel();
                    return PollOutcome::GaveUp;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_millis(1000);

    fn running(progress: f64) -> JobStatus {
        JobStatus {
            id: None,
            kind: JobKind::Scan,
            progress: Some(progress),
            state: JobState::Running,
            detail: None,
        }
    }

    fn complete() -> JobStatus {
        JobStatus {
            state: JobState::Complete,
            ..running(100.0)
        }
    }

    fn unbounded() -> JobPoller {
        JobPoller::new(INTERVAL, PollPolicy::default())
    }

    async fn submit_scan() -> Result<JobHandle, ApiError> {
        Ok(JobHandle::scan())
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_first_terminal_status_and_completes_once() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let completions = Arc::new(AtomicUsize::new(0));
        let k = 4;

        let counter = fetches.clone();
        let done = completions.clone();
        let handle = unbounded()
            .start(
                JobKind::Scan,
                submit_scan,
                move |_| {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok(if n > k { complete() } else { running(n as f64) }) }
                },
                move |_| {
                    done.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await
            .unwrap();

        let outcome = handle.join().await;
        assert_eq!(outcome, PollOutcome::Finished(complete()));
        assert_eq!(fetches.load(Ordering::SeqCst), k + 1);
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(fetches.load(Ordering::SeqCst), k + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_progress_scenario_completes_on_second_poll() {
        let responses = [
            ScanProgress { scanned: 3, total: 10, current_file: Some("a.mp3".into()) },
            ScanProgress { scanned: 10, total: 10, current_file: None },
        ];
        let fetches = Arc::new(AtomicUsize::new(0));
        let completions = Arc::new(AtomicUsize::new(0));

        let counter = fetches.clone();
        let done = completions.clone();
        let handle = unbounded()
            .start(
                JobKind::Scan,
                submit_scan,
                move |_| {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let progress = responses[n.min(1)].clone();
                    async move { Ok(scan_status(&progress)) }
                },
                move |_| {
                    done.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await
            .unwrap();

        let mut status = handle.subscribe();
        status.changed().await.unwrap();
        let first = status.borrow().clone().unwrap();
        assert_eq!(first.state, JobState::Running);
        assert_eq!(first.progress, Some(30.0));

        match handle.join().await {
            PollOutcome::Finished(status) => assert_eq!(status.state, JobState::Complete),
            other => panic!("Expected finished poll, got {:?}", other),
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_do_not_stop_the_poll() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();

        let handle = unbounded()
            .start(
                JobKind::Download,
                || async { Ok::<_, ApiError>(JobHandle::download(DownloadSource::YouTube, "7")) },
                move |_| {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        match n {
                            0 | 1 => Err(ApiError::Decode("bad gateway page".into())),
                            _ => Ok(complete()),
                        }
                    }
                },
                |_| {},
            )
            .await
            .unwrap();

        assert!(matches!(handle.join().await, PollOutcome::Finished(_)));
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_consecutive_failures() {
        let poller = JobPoller::new(
            INTERVAL,
            PollPolicy {
                timeout: None,
                max_failures: Some(3),
            },
        );
        let completions = Arc::new(AtomicUsize::new(0));
        let done = completions.clone();

        let handle = poller
            .start(
                JobKind::Scan,
                submit_scan,
                |_| async { Err(ApiError::Decode("down".into())) },
                move |_| {
                    done.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await
            .unwrap();

        assert_eq!(handle.join().await, PollOutcome::GaveUp);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_terminal_status() {
        let poller = JobPoller::new(
            INTERVAL,
            PollPolicy {
                timeout: Some(Duration::from_secs(5)),
                max_failures: None,
            },
        );

        let handle = poller
            .start(
                JobKind::Scan,
                submit_scan,
                |_| async { Ok(running(10.0)) },
                |_| panic!("must not complete"),
            )
            .await
            .unwrap();

        assert_eq!(handle.join().await, PollOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submit_spawns_nothing() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();

        let result = unbounded()
            .start(
                JobKind::Scan,
                || async {
                    Err::<JobHandle, _>(ApiError::Status {
                        status: 409,
                        reason: "Conflict".into(),
                    })
                },
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(complete()) }
                },
                |_| {},
            )
            .await;

        assert!(result.is_err());
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let handle = unbounded()
            .start(
                JobKind::Scan,
                submit_scan,
                |_| async { Ok(running(1.0)) },
                |_| panic!("must not complete"),
            )
            .await
            .unwrap();

        tokio::time::sleep(INTERVAL * 2).await;
        handle.cancel();
        handle.cancel();

        assert_eq!(handle.join().await, PollOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_completion_is_not_reported_as_cancelled() {
        let handle = unbounded()
            .start(
                JobKind::Scan,
                submit_scan,
                |_| async { Ok(complete()) },
                |_| panic!("completion handler failed"),
            )
            .await
            .unwrap();

        assert_eq!(handle.join().await, PollOutcome::Panicked);
    }

    #[test]
    fn download_status_maps_server_states() {
        let record = |status: &str| DownloadRecord {
            url: "https://youtu.be/x".into(),
            status: status.into(),
            progress: Some(40.0),
            filename: None,
            error: Some("boom".into()),
        };

        assert_eq!(download_status("1", None).state, JobState::Pending);
        assert_eq!(download_status("1", Some(&record("downloading"))).state, JobState::Running);
        assert_eq!(download_status("1", Some(&record("completed"))).state, JobState::Complete);

        let failed = download_status("1", Some(&record("error")));
        assert_eq!(failed.state, JobState::Failed);
        assert!(failed.is_terminal());
        assert_eq!(failed.detail.as_deref(), Some("boom"));
    }

    #[test]
    fn scan_with_nothing_reported_is_pending() {
        let status = scan_status(&ScanProgress::default());
        assert_eq!(status.state, JobState::Pending);
        assert_eq!(status.progress, None);
    }
}
