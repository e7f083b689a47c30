//! Background-job polling.
//!
//! Long-running server jobs (feature computation, model training,
//! predictions, projections) are started by a mutation that returns at once.
//! Completion is observed by re-probing the server until it says the job is
//! done:
//!
//! ```text
//! in_progress = true
//! loop:
//!     probe()  -> Completed: in_progress = false, stop
//!              -> Running or Err: keep going
//!     wait for `interval` or a change of the marker
//! ```
//!
//! There is no backoff and no retry limit. Polling also stops as soon as
//! nobody listens to `in_progress` any more, and [`JobWatch`] aborts its task
//! when dropped.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ApiError;
use crate::models::{ProjectState, ProjectionReply, StateSection};
use crate::ops::Session;
use crate::resource::{Resource, ResourceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
}

/// One status check of a background job.
#[async_trait]
pub trait JobProbe: Send + Sync {
    async fn probe(&self) -> Result<JobStatus, ApiError>;
}

/// How a polling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEnd {
    /// A probe reported completion.
    Completed { probes: u32 },
    /// Every `in_progress` receiver was dropped first.
    Abandoned { probes: u32 },
}

impl PollEnd {
    pub fn probes(&self) -> u32 {
        match self {
            PollEnd::Completed { probes } | PollEnd::Abandoned { probes } => *probes,
        }
    }
}

/// Probes until the job completes, publishing progress on `in_progress`.
///
/// `marker` re-triggers an immediate probe whenever its value changes (for
/// example a new projection id); a closed marker falls back to the interval.
pub async fn poll_until_complete(
    probe: &dyn JobProbe,
    interval: Duration,
    mut marker: Option<watch::Receiver<u64>>,
    in_progress: &watch::Sender<bool>,
) -> PollEnd {
    in_progress.send_replace(true);
    let mut probes = 0;
    loop {
        if in_progress.is_closed() {
            tracing::debug!(probes, "nobody is watching, polling stopped");
            return PollEnd::Abandoned { probes };
        }
        probes += 1;
        match probe.probe().await {
            Ok(JobStatus::Completed) => {
                in_progress.send_replace(false);
                tracing::debug!(probes, "job completed");
                return PollEnd::Completed { probes };
            }
            Ok(JobStatus::Running) => {}
            Err(e) => tracing::debug!(error = %e, "probe failed, still polling"),
        }

        let marker_closed = match marker.as_mut() {
            Some(rx) => tokio::select! {
                _ = tokio::time::sleep(interval) => false,
                changed = rx.changed() => changed.is_err(),
            },
            None => {
                tokio::time::sleep(interval).await;
                false
            }
        };
        if marker_closed {
            marker = None;
        }
    }
}

/// A polling loop running on the tokio runtime.
pub struct JobWatch {
    in_progress: watch::Receiver<bool>,
    handle: JoinHandle<PollEnd>,
}

impl JobWatch {
    pub fn start(
        probe: Arc<dyn JobProbe>,
        interval: Duration,
        marker: Option<watch::Receiver<u64>>,
    ) -> Self {
        let (tx, in_progress) = watch::channel(true);
        let handle = tokio::spawn(async move {
            poll_until_complete(probe.as_ref(), interval, marker, &tx).await
        });
        Self {
            in_progress,
            handle,
        }
    }

    pub fn in_progress(&self) -> bool {
        *self.in_progress.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.in_progress.clone()
    }

    /// Waits until the job is reported complete. Returns `false` if the
    /// polling task ended some other way.
    pub async fn wait(&mut self) -> bool {
        self.in_progress.wait_for(|busy| !*busy).await.is_ok()
    }
}

impl Drop for JobWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Watches the `training` entry of one project state section.
pub struct ProjectJobProbe {
    session: Arc<Session>,
    project_slug: String,
    section: StateSection,
    username: Option<String>,
    state: Resource<String, ProjectState>,
}

impl ProjectJobProbe {
    /// `username` narrows per-user sections (models) to that user's job.
    pub fn new(
        session: Arc<Session>,
        project_slug: &str,
        section: StateSection,
        username: Option<String>,
    ) -> Self {
        Self {
            session,
            project_slug: project_slug.to_string(),
            section,
            username,
            state: Resource::new(),
        }
    }

    /// Last project state read by the probe.
    pub fn state(&self) -> Option<ProjectState> {
        self.state.value()
    }
}

#[async_trait]
impl JobProbe for ProjectJobProbe {
    async fn probe(&self) -> Result<JobStatus, ApiError> {
        self.state.refetch();
        let session = self.session.clone();
        self.state
            .sync(self.project_slug.clone(), |slug| async move {
                session.fetch_project_state(&slug).await
            })
            .await;
        match self.state.state() {
            ResourceState::Resolved(state) => {
                if state.is_training(self.section, self.username.as_deref()) {
                    Ok(JobStatus::Running)
                } else {
                    Ok(JobStatus::Completed)
                }
            }
            ResourceState::Errored(err) => Err(err),
            ResourceState::Pending => Ok(JobStatus::Running),
        }
    }
}

/// Completes once the server returns projection coordinates.
pub struct ProjectionProbe {
    session: Arc<Session>,
    project_slug: String,
    scheme: Option<String>,
}

impl ProjectionProbe {
    pub fn new(session: Arc<Session>, project_slug: &str, scheme: Option<&str>) -> Self {
        Self {
            session,
            project_slug: project_slug.to_string(),
            scheme: scheme.map(str::to_string),
        }
    }
}

#[async_trait]
impl JobProbe for ProjectionProbe {
    async fn probe(&self) -> Result<JobStatus, ApiError> {
        let reply = self
            .session
            .fetch_projection(&self.project_slug, self.scheme.as_deref())
            .await?;
        Ok(match reply {
            ProjectionReply::Ready(_) => JobStatus::Completed,
            ProjectionReply::Waiting(_) | ProjectionReply::None(_) => JobStatus::Running,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted statuses and records `in_progress` at each probe.
    struct Scripted {
        statuses: Mutex<VecDeque<Result<JobStatus, ApiError>>>,
        seen: Mutex<Vec<bool>>,
        in_progress: watch::Receiver<bool>,
    }

    impl Scripted {
        fn new(
            statuses: Vec<Result<JobStatus, ApiError>>,
            in_progress: watch::Receiver<bool>,
        ) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                seen: Mutex::new(Vec::new()),
                in_progress,
            }
        }
    }

    #[async_trait]
    impl JobProbe for Scripted {
        async fn probe(&self) -> Result<JobStatus, ApiError> {
            self.seen.lock().unwrap().push(*self.in_progress.borrow());
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(JobStatus::Running))
        }
    }

    #[tokio::test]
    async fn stops_at_the_first_completed_probe() {
        let (tx, rx) = watch::channel(false);
        let probe = Scripted::new(
            vec![
                Ok(JobStatus::Running),
                Ok(JobStatus::Running),
                Ok(JobStatus::Completed),
            ],
            rx.clone(),
        );
        let end = poll_until_complete(&probe, Duration::from_millis(5), None, &tx).await;

        assert_eq!(end, PollEnd::Completed { probes: 3 });
        assert_eq!(*probe.seen.lock().unwrap(), vec![true, true, true]);
        assert!(!*rx.borrow());
    }

    #[tokio::test]
    async fn probe_errors_count_as_running() {
        let (tx, rx) = watch::channel(false);
        let probe = Scripted::new(
            vec![
                Err(ApiError::Network("refused".to_string())),
                Ok(JobStatus::Completed),
            ],
            rx,
        );
        let end = poll_until_complete(&probe, Duration::from_millis(5), None, &tx).await;
        assert_eq!(end.probes(), 2);
    }

    #[tokio::test]
    async fn marker_change_triggers_an_early_probe() {
        let (tx, rx) = watch::channel(false);
        let (marker_tx, marker_rx) = watch::channel(0u64);
        let probe = Scripted::new(
            vec![Ok(JobStatus::Running), Ok(JobStatus::Completed)],
            rx,
        );

        let poll = poll_until_complete(&probe, Duration::from_secs(3600), Some(marker_rx), &tx);
        let bump = async {
            tokio::task::yield_now().await;
            marker_tx.send_replace(1);
        };
        let (end, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(poll, bump)
        })
        .await
        .expect("marker change should end the hour-long wait");
        assert_eq!(end, PollEnd::Completed { probes: 2 });
    }

    #[tokio::test]
    async fn stops_when_nobody_listens() {
        let (_probe_tx, probe_rx) = watch::channel(false);
        let probe = Scripted::new(vec![], probe_rx);
        let (tx, rx) = watch::channel(false);
        drop(rx);
        let end = poll_until_complete(&probe, Duration::from_millis(5), None, &tx).await;
        assert_eq!(end, PollEnd::Abandoned { probes: 0 });
    }

    #[tokio::test]
    async fn job_watch_reports_completion() {
        let (_tx, rx) = watch::channel(false);
        let probe = Arc::new(Scripted::new(
            vec![Ok(JobStatus::Running), Ok(JobStatus::Completed)],
            rx,
        ));
        let mut watch = JobWatch::start(probe, Duration::from_millis(5), None);
        assert!(watch.in_progress());
        assert!(watch.wait().await);
        assert!(!watch.in_progress());
    }
}
