use crate::access_log::RequestInfo;
use chrono::Utc;
use reqlog_core::config::RecorderConfig;
use reqlog_core::entry::LogEntry;
use reqlog_store::LogStore;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Fire-and-forget request recorder.
///
/// Entries go onto a bounded queue drained by a single writer task, which
/// appends them to the [`LogStore`] on the blocking pool. `record` never
/// waits: a full or closed queue drops the entry with a warning.
#[derive(Clone)]
pub struct RequestRecorder {
    sender: mpsc::Sender<LogEntry>,
}

/// Owner handle for the writer task. Call [`RecorderTask::shutdown`] to stop
/// accepting entries and flush what is already queued.
pub struct RecorderTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RequestRecorder {
    /// Spawn the writer task on the current tokio runtime.
    pub fn spawn(store: Arc<LogStore>, config: &RecorderConfig) -> (Self, RecorderTask) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(Self::write_loop(store, rx, shutdown_rx));
        (
            Self { sender: tx },
            RecorderTask {
                shutdown: shutdown_tx,
                handle,
            },
        )
    }

    /// Record one completed request. Returns `false` if the entry was dropped.
    pub fn record(&self, info: RequestInfo, status: u16) -> bool {
        self.record_entry(info.into_entry(status, Utc::now()))
    }

    pub fn record_entry(&self, entry: LogEntry) -> bool {
        let row = entry.to_row();
        match self.sender.try_send(entry) {
            Ok(()) => {
                info!(row = %row, "Request recorded");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(row = %row, "Request log queue full, entry dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(row = %row, "Request recorder stopped, entry dropped");
                false
            }
        }
    }

    async fn write_loop(
        store: Arc<LogStore>,
        mut rx: mpsc::Receiver<LogEntry>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(entry) => Self::persist(&store, entry).await,
                    None => break,
                },
                // Fires on an explicit shutdown or when the handle is dropped.
                _ = &mut shutdown => {
                    rx.close();
                    let mut drained = 0usize;
                    while let Some(entry) = rx.recv().await {
                        Self::persist(&store, entry).await;
                        drained += 1;
                    }
                    debug!(drained, "Request recorder drained");
                    break;
                }
            }
        }
        debug!("Request recorder stopped");
    }

    async fn persist(store: &Arc<LogStore>, entry: LogEntry) {
        let store = Arc::clone(store);
        match tokio::task::spawn_blocking(move || store.append(&entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Failed to append request log entry"),
            Err(e) => error!(error = %e, "Request log writer task panicked"),
        }
    }
}

impl RecorderTask {
    /// Close the queue and wait until every accepted entry is on disk.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            error!(error = %e, "Request recorder task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn entry(n: u16) -> LogEntry {
        let t = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        LogEntry::new("test-agent", t, "GET", format!("/{n}"), "HTTP/1.1", 200)
    }

    #[tokio::test]
    async fn recorded_entries_reach_the_store_in_order() {
        let dir = tempdir().unwrap();
        let store = Arc::new(LogStore::with_path(dir.path().join("log.csv"), 20));
        let (recorder, task) = RequestRecorder::spawn(Arc::clone(&store), &RecorderConfig::default());

        for n in 0..5 {
            assert!(recorder.record_entry(entry(n)));
        }
        task.shutdown().await;

        let got = store.read_all().unwrap();
        assert_eq!(got, (0..5).map(entry).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn record_builds_entry_from_request_info() {
        let dir = tempdir().unwrap();
        let store = Arc::new(LogStore::with_path(dir.path().join("log.csv"), 20));
        let (recorder, task) = RequestRecorder::spawn(Arc::clone(&store), &RecorderConfig::default());

        let info = RequestInfo {
            agent: "ua, with comma".into(),
            method: "GET".into(),
            resource: "/missing".into(),
            version: "HTTP/1.1".into(),
        };
        assert!(recorder.record(info, 404));
        task.shutdown().await;

        let got = store.read_all().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].agent, "ua  with comma");
        assert_eq!(got[0].status, 404);
        assert!(got[0].time.ends_with('Z'));
    }

    #[tokio::test]
    async fn recording_is_bounded_by_retention() {
        let dir = tempdir().unwrap();
        let store = Arc::new(LogStore::with_path(dir.path().join("log.csv"), 20));
        let (recorder, task) = RequestRecorder::spawn(Arc::clone(&store), &RecorderConfig::default());

        for n in 0..25 {
            recorder.record_entry(entry(n));
        }
        task.shutdown().await;

        let got = store.read_all().unwrap();
        assert_eq!(got, (5..25).map(entry).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let recorder = RequestRecorder { sender: tx };
        assert!(recorder.record_entry(entry(1)));
        assert!(!recorder.record_entry(entry(2)));
    }

    #[tokio::test]
    async fn record_after_shutdown_is_dropped() {
        let dir = tempdir().unwrap();
        let store = Arc::new(LogStore::with_path(dir.path().join("log.csv"), 20));
        let (recorder, task) = RequestRecorder::spawn(Arc::clone(&store), &RecorderConfig::default());
        task.shutdown().await;

        assert!(!recorder.record_entry(entry(1)));
    }

    /// Wait until the writer has taken every queued entry off the channel.
    async fn wait_until_dequeued(recorder: &RequestRecorder) {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while recorder.sender.capacity() < recorder.sender.max_capacity() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn write_failures_do_not_stop_the_writer() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // Parent is a regular file, so appends fail until it becomes a directory.
        let store = Arc::new(LogStore::with_path(blocker.join("log.csv"), 20));
        let (recorder, task) = RequestRecorder::spawn(Arc::clone(&store), &RecorderConfig::default());

        assert!(recorder.record_entry(entry(1)));
        wait_until_dequeued(&recorder).await;
        // Entries are persisted one at a time, so once entry 2 is dequeued
        // the failed append of entry 1 has finished.
        assert!(recorder.record_entry(entry(2)));
        wait_until_dequeued(&recorder).await;

        std::fs::remove_file(&blocker).unwrap();
        std::fs::create_dir_all(&blocker).unwrap();

        assert!(recorder.record_entry(entry(3)));
        task.shutdown().await;

        let resources: Vec<String> = store
            .read_all()
            .unwrap()
            .into_iter()
            .map(|e| e.resource)
            .collect();
        assert!(!resources.contains(&"/1".to_string()));
        assert_eq!(resources.last().map(String::as_str), Some("/3"));
    }
}
