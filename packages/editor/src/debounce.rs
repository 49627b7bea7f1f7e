//! # Debounced Persistence
//!
//! Every [`DebouncedWriter::schedule`] restarts a fixed-delay timer. Only
//! the timer of the last call in a burst survives, and when it fires it
//! persists whatever snapshot was scheduled most recently.
//!
//! ```text
//! schedule ─┐ schedule ─┐ schedule ─┐
//!           ╳           ╳           └──── delay ────▶ persist(latest)
//! ```
//!
//! Writes never overlap. A timer that fires while an earlier write is
//! still running waits for it, then persists the latest snapshot, so the
//! last state scheduled is the last state written.
//!
//! [`DebouncedWriter::cancel`] stops a pending timer, including one that
//! is waiting on an earlier write. A write that has already started always
//! runs to completion.
//!
//! Timers run on the tokio runtime the writer was created on, so
//! [`DebouncedWriter::schedule`] may be called from any thread. A writer
//! created outside a runtime uses whichever runtime is current at schedule
//! time and reports a [`PersistFailure`] when there is none.

use crate::collab::{Persist, PersistError};
use crate::document::DocumentSnapshot;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

type WriteLock = tokio::sync::Mutex<()>;

/// A debounced write that did not make it to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistFailure {
    pub snapshot: DocumentSnapshot,
    pub error: PersistError,
}

pub struct DebouncedWriter {
    delay: Duration,
    persist: Arc<dyn Persist>,
    latest: Arc<Mutex<Option<DocumentSnapshot>>>,
    pending: Option<CancellationToken>,
    writing: Arc<WriteLock>,
    runtime: Option<Handle>,
    failures: UnboundedSender<PersistFailure>,
}

impl DebouncedWriter {
    pub fn new(
        delay: Duration,
        persist: Arc<dyn Persist>,
    ) -> (Self, UnboundedReceiver<PersistFailure>) {
        let (failures, failures_rx) = unbounded_channel();
        (
            Self {
                delay,
                persist,
                latest: Arc::new(Mutex::new(None)),
                pending: None,
                writing: Arc::new(WriteLock::new(())),
                runtime: Handle::try_current().ok(),
                failures,
            },
            failures_rx,
        )
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Remember `snapshot` as the state to persist and restart the timer
    pub fn schedule(&mut self, snapshot: DocumentSnapshot) {
        let Some(runtime) = self
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
        else {
            tracing::warn!("No tokio runtime; debounced write dropped");
            let error = PersistError::Unavailable("no tokio runtime".to_string());
            let _ = self.failures.send(PersistFailure { snapshot, error });
            return;
        };

        *lock(&self.latest) = Some(snapshot);

        if let Some(previous) = self.pending.take() {
            previous.cancel();
        }

        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        let delay = self.delay;
        let latest = self.latest.clone();
        let persist = self.persist.clone();
        let writing = self.writing.clone();
        let failures = self.failures.clone();

        runtime.spawn(async move {
            let _write = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                write = async move {
                    tokio::time::sleep(delay).await;
                    writing.lock_owned().await
                } => write,
            };

            // Past this point the write is in flight and cancel has no effect
            let Some(snapshot) = lock(&latest).take() else {
                return;
            };

            match persist.persist(&snapshot).await {
                Ok(()) => {
                    tracing::debug!(blocks = snapshot.primary.len(), "Persisted document");
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Debounced write failed");
                    let _ = failures.send(PersistFailure { snapshot, error });
                }
            }
        });
    }

    /// Stop the pending timer, if any. Returns whether one was stopped.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                lock(&self.latest).take().is_some()
            }
            _ => false,
        }
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(latest: &Mutex<Option<DocumentSnapshot>>) -> MutexGuard<'_, Option<DocumentSnapshot>> {
    latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use livepage_protocol::Block;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Instant};

    /// Records when each write happened and what it carried
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Instant, DocumentSnapshot)>>,
        write_time: Duration,
        /// Overrides `write_time` for the first write only
        first_write_time: Option<Duration>,
        started: AtomicUsize,
        fail: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<(Instant, DocumentSnapshot)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Persist for Recorder {
        async fn persist(&self, snapshot: &DocumentSnapshot) -> Result<(), PersistError> {
            let write_time = match self.started.fetch_add(1, Ordering::SeqCst) {
                0 => self.first_write_time.unwrap_or(self.write_time),
                _ => self.write_time,
            };
            sleep(write_time).await;
            self.calls
                .lock()
                .unwrap()
                .push((Instant::now(), snapshot.clone()));
            if self.fail {
                Err(PersistError::Unavailable("disk full".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn state(n: usize) -> DocumentSnapshot {
        DocumentSnapshot {
            primary: vec![Block::new("hero-1", "hero", format!("<h1>v{}</h1>", n))],
            variant: None,
        }
    }

    fn within(actual: Duration, expected_ms: u64) -> bool {
        let expected = Duration::from_millis(expected_ms);
        actual >= expected && actual < expected + Duration::from_millis(10)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_write_of_latest_state() {
        let recorder = Arc::new(Recorder::default());
        let (mut writer, _failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        let start = Instant::now();
        for n in 1..=4 {
            writer.schedule(state(n));
            if n < 4 {
                sleep(Duration::from_millis(100)).await;
            }
        }
        sleep(Duration::from_secs(5)).await;

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        assert!(within(calls[0].0 - start, 1800), "fired at {:?}", calls[0].0 - start);
        assert_eq!(calls[0].1, state(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_write_separately() {
        let recorder = Arc::new(Recorder::default());
        let (mut writer, _failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        writer.schedule(state(1));
        sleep(Duration::from_secs(2)).await;
        writer.schedule(state(2));
        sleep(Duration::from_secs(2)).await;

        let written: Vec<_> = recorder.calls().into_iter().map(|(_, s)| s).collect();
        assert_eq!(written, vec![state(1), state(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_write() {
        let recorder = Arc::new(Recorder::default());
        let (mut writer, _failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        writer.schedule(state(1));
        sleep(Duration::from_millis(500)).await;
        assert!(writer.cancel());
        assert!(!writer.cancel());

        sleep(Duration::from_secs(5)).await;
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_does_not_abort_inflight_write() {
        let recorder = Arc::new(Recorder {
            write_time: Duration::from_millis(400),
            ..Recorder::default()
        });
        let (mut writer, _failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        writer.schedule(state(1));
        sleep(Duration::from_millis(1600)).await;
        assert!(!writer.cancel());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_write_is_never_overtaken() {
        let recorder = Arc::new(Recorder {
            first_write_time: Some(Duration::from_millis(3000)),
            ..Recorder::default()
        });
        let (mut writer, _failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        let start = Instant::now();
        writer.schedule(state(1));
        sleep(Duration::from_millis(1600)).await;
        writer.schedule(state(2));
        sleep(Duration::from_secs(10)).await;

        let calls = recorder.calls();
        let written: Vec<_> = calls.iter().map(|(_, s)| s.clone()).collect();
        assert_eq!(written, vec![state(1), state(2)]);

        // The second write waits for the first to land at 4500ms
        assert!(within(calls[1].0 - start, 4500), "landed at {:?}", calls[1].0 - start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting_on_earlier_write() {
        let recorder = Arc::new(Recorder {
            first_write_time: Some(Duration::from_millis(3000)),
            ..Recorder::default()
        });
        let (mut writer, _failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        writer.schedule(state(1));
        sleep(Duration::from_millis(1600)).await;
        writer.schedule(state(2));
        sleep(Duration::from_millis(2000)).await;
        assert!(writer.cancel());

        sleep(Duration::from_secs(10)).await;
        let written: Vec<_> = recorder.calls().into_iter().map(|(_, s)| s).collect();
        assert_eq!(written, vec![state(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_reported() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let (mut writer, mut failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        writer.schedule(state(7));
        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.snapshot, state(7));
        assert_eq!(failure.error, PersistError::Unavailable("disk full".to_string()));
    }

    #[test]
    fn test_schedule_without_runtime_reports_failure() {
        let recorder = Arc::new(Recorder::default());
        let (mut writer, mut failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        writer.schedule(state(1));

        let failure = failures.try_recv().unwrap();
        assert_eq!(failure.snapshot, state(1));
        assert!(matches!(failure.error, PersistError::Unavailable(_)));
        assert!(!writer.cancel());
    }

    #[test]
    fn test_schedule_from_plain_thread_uses_creating_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let (writer, _failures) = {
            let _entered = runtime.enter();
            DebouncedWriter::new(Duration::from_millis(10), recorder.clone())
        };

        let writer = std::thread::spawn(move || {
            let mut writer = writer;
            writer.schedule(state(1));
            writer
        })
        .join()
        .unwrap();

        runtime.block_on(async { sleep(Duration::from_millis(200)).await });
        assert_eq!(recorder.calls().len(), 1);
        drop(writer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_write() {
        let recorder = Arc::new(Recorder::default());
        let (mut writer, _failures) =
            DebouncedWriter::new(Duration::from_millis(1500), recorder.clone());

        writer.schedule(state(1));
        drop(writer);

        sleep(Duration::from_secs(5)).await;
        assert!(recorder.calls().is_empty());
    }
}
