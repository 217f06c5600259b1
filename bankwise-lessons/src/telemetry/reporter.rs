//! Periodic telemetry reporter.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::payload::TelemetryPayload;
use super::sink::TelemetrySink;
use crate::config::TelemetryConfig;
use crate::error::TelemetryError;
use crate::session::SharedSession;

/// Result of one reporting attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Sent,
    /// State unchanged since the last successful send.
    Skipped,
}

/// Pushes session snapshots to a [`TelemetrySink`].
pub struct TelemetryReporter {
    session: SharedSession,
    sink: Arc<dyn TelemetrySink>,
    interval: Duration,
    dedupe: bool,
    last_sent: Option<TelemetryPayload>,
}

impl TelemetryReporter {
    pub fn new(
        session: SharedSession,
        sink: Arc<dyn TelemetrySink>,
        config: &TelemetryConfig,
    ) -> Self {
        Self {
            session,
            sink,
            interval: config.interval(),
            dedupe: config.dedupe,
            last_sent: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Capture and send one snapshot.
    ///
    /// The session read lock is released before the sink is called. A
    /// failed send is not remembered, so the next attempt resends.
    pub async fn report_once(&mut self) -> Result<ReportOutcome, TelemetryError> {
        let payload = {
            let session = self.session.read().await;
            TelemetryPayload::capture(&session)
        };

        if self.dedupe
            && let Some(last) = &self.last_sent
            && last.same_state(&payload)
        {
            trace!("Telemetry state unchanged, skipping");
            return Ok(ReportOutcome::Skipped);
        }

        self.sink.send(&payload).await?;
        debug!(
            session_id = %payload.session_id,
            active = payload.state.active_lessons.len(),
            completed = payload.state.completed_lessons.len(),
            "Telemetry snapshot sent"
        );
        self.last_sent = Some(payload);
        Ok(ReportOutcome::Sent)
    }

    /// Run on a fixed interval until the returned handle is stopped or dropped.
    pub fn spawn(mut self) -> TelemetryHandle {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let task = tokio::spawn(async move {
            info!(interval_ms = self.interval.as_millis() as u64, "Telemetry reporter started");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Telemetry reporter received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.report_once().await {
                            warn!(error = %e, "Telemetry send failed");
                        }
                    }
                }
            }

            info!("Telemetry reporter stopped");
        });

        TelemetryHandle {
            shutdown,
            task: Some(task),
        }
    }
}

/// Handle to a running reporter. Dropping it cancels the reporter.
#[derive(Debug)]
pub struct TelemetryHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TelemetryHandle {
    /// Cancel the reporter and wait for it to finish.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Telemetry reporter task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for TelemetryHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::lesson::Lesson;
    use crate::session::LessonSession;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<TelemetryPayload>>,
        failing: AtomicBool,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TelemetrySink for RecordingSink {
        async fn send(&self, payload: &TelemetryPayload) -> Result<(), TelemetryError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TelemetryError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn reporter(dedupe: bool) -> (SharedSession, Arc<RecordingSink>, TelemetryReporter) {
        let session = LessonSession::new(&EngineConfig::default()).into_shared();
        let sink = Arc::new(RecordingSink::default());
        let config = TelemetryConfig {
            dedupe,
            ..TelemetryConfig::default()
        };
        let reporter = TelemetryReporter::new(session.clone(), sink.clone(), &config);
        (session, sink, reporter)
    }

    #[tokio::test]
    async fn unchanged_state_is_skipped() {
        let (session, sink, mut reporter) = reporter(true);

        assert_eq!(reporter.report_once().await.unwrap(), ReportOutcome::Sent);
        assert_eq!(reporter.report_once().await.unwrap(), ReportOutcome::Skipped);

        session
            .write()
            .await
            .activate_lesson(Arc::new(Lesson::new("savings", "Savings")))
            .unwrap();
        assert_eq!(reporter.report_once().await.unwrap(), ReportOutcome::Sent);
        assert_eq!(sink.count(), 2);
    }

    #[tokio::test]
    async fn dedupe_disabled_always_sends() {
        let (_session, sink, mut reporter) = reporter(false);
        for _ in 0..3 {
            assert_eq!(reporter.report_once().await.unwrap(), ReportOutcome::Sent);
        }
        assert_eq!(sink.count(), 3);
    }

    #[tokio::test]
    async fn failed_send_is_retried_next_time() {
        let (_session, sink, mut reporter) = reporter(true);

        sink.failing.store(true, Ordering::SeqCst);
        assert!(matches!(
            reporter.report_once().await,
            Err(TelemetryError::Status { status: 503, .. })
        ));

        sink.failing.store(false, Ordering::SeqCst);
        assert_eq!(reporter.report_once().await.unwrap(), ReportOutcome::Sent);
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_reporter_sends_on_interval_until_stopped() {
        let (session, sink, reporter) = reporter(true);
        let handle = reporter.spawn();

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(sink.count(), 1);

        session
            .write()
            .await
            .activate_lesson(Arc::new(Lesson::new("goals", "Goals")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(sink.count(), 2);

        handle.stop().await;
        session.write().await.tick(5.0);
        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(sink.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels_reporter() {
        let (session, sink, reporter) = reporter(false);
        let handle = reporter.spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let sent = sink.count();

        drop(handle);
        session.write().await.tick(1.0);
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(sink.count(), sent);
    }
}
