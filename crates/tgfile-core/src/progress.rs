//! Transfer progress observation.
//!
//! The task that moves bytes owns the stream and advances a shared
//! [`TransferCursor`]. A [`ProgressMonitor`] polls that cursor on its own task
//! and reports samples to the caller's observer. The monitor never touches the
//! stream itself.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;

/// Default polling interval of the monitor.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(25);

/// One observation of a running transfer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSample {
    pub transferred: u64,
    pub total: u64,
    /// `transferred / total`, within `[0, 1]`.
    pub fraction: f64,
}

impl ProgressSample {
    pub fn new(transferred: u64, total: u64) -> Self {
        let fraction = if transferred >= total {
            1.0
        } else {
            (transferred as f64 / total as f64).clamp(0.0, 1.0)
        };
        Self {
            transferred,
            total,
            fraction,
        }
    }
}

/// Caller-supplied progress callback.
///
/// Invoked from the monitor task, never after the transfer call returns.
pub type ProgressObserver = Arc<dyn Fn(ProgressSample) + Send + Sync>;

/// Synchronized position handle shared by the copy and the monitor.
#[derive(Debug)]
pub struct TransferCursor {
    position: AtomicU64,
    /// Known size of the payload. Unknown sizes report the position as total.
    total: Option<u64>,
    complete: AtomicBool,
}

impl TransferCursor {
    pub fn new(total: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            position: AtomicU64::new(0),
            total,
            complete: AtomicBool::new(false),
        })
    }

    /// Record `n` more bytes moved.
    pub fn advance(&self, n: u64) {
        self.position.fetch_add(n, Ordering::SeqCst);
    }

    pub fn position(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    /// Consistent `(position, total)` pair.
    pub fn snapshot(&self) -> (u64, u64) {
        let position = self.position();
        let total = self.total.map_or(position, |t| t.max(position));
        (position, total)
    }

    pub fn sample(&self) -> ProgressSample {
        let (position, total) = self.snapshot();
        ProgressSample::new(position, total)
    }

    /// Mark the byte copy as finished successfully. The monitor then flushes a
    /// final sample before exiting.
    pub fn mark_complete(&self) {
        self.complete.store(true, Ordering::SeqCst);
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }
}

/// Polling loop reporting a cursor to an observer.
pub struct ProgressMonitor {
    cursor: Arc<TransferCursor>,
    observer: ProgressObserver,
    interval: Duration,
    last: Option<u64>,
}

impl ProgressMonitor {
    pub fn new(cursor: Arc<TransferCursor>, observer: ProgressObserver, interval: Duration) -> Self {
        Self {
            cursor,
            observer,
            interval,
            last: None,
        }
    }

    /// Spawn the loop on the runtime. The task ends when `stop` is cancelled.
    ///
    /// Without an observer nothing is spawned.
    pub fn spawn(
        cursor: Arc<TransferCursor>,
        observer: Option<ProgressObserver>,
        interval: Duration,
        stop: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let observer = observer?;
        let monitor = Self::new(cursor, observer, interval);
        Some(tokio::spawn(monitor.run(stop)))
    }

    pub async fn run(mut self, stop: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
            if stop.is_cancelled() {
                break;
            }
            self.report();
        }

        if self.cursor.is_complete() {
            self.report();
        }
    }

    /// Invoke the observer if the position moved forward.
    fn report(&mut self) {
        let sample = self.cursor.sample();
        if self.last.is_some_and(|prev| sample.transferred <= prev) {
            return;
        }
        self.last = Some(sample.transferred);
        (self.observer)(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (ProgressObserver, Arc<Mutex<Vec<ProgressSample>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: ProgressObserver = Arc::new(move |s| sink.lock().unwrap().push(s));
        (observer, seen)
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(ProgressSample::new(0, 10).fraction, 0.0);
        assert_eq!(ProgressSample::new(5, 10).fraction, 0.5);
        assert_eq!(ProgressSample::new(10, 10).fraction, 1.0);
        assert_eq!(ProgressSample::new(0, 0).fraction, 1.0);
    }

    #[test]
    fn unknown_total_follows_position() {
        let c = TransferCursor::new(None);
        c.advance(7);
        assert_eq!(c.snapshot(), (7, 7));
    }

    #[tokio::test]
    async fn no_observer_spawns_nothing() {
        let c = TransferCursor::new(Some(1));
        let h = ProgressMonitor::spawn(c, None, DEFAULT_PROGRESS_INTERVAL, CancellationToken::new());
        assert!(h.is_none());
    }

    #[tokio::test]
    async fn reports_only_forward_movement() {
        let cursor = TransferCursor::new(Some(100));
        let (observer, seen) = recorder();
        let stop = CancellationToken::new();
        let handle = ProgressMonitor::spawn(
            cursor.clone(),
            Some(observer),
            Duration::from_millis(5),
            stop.clone(),
        )
        .unwrap();

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cursor.advance(25);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.cancel();
        handle.await.unwrap();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        for pair in seen.windows(2) {
            assert!(pair[0].transferred < pair[1].transferred);
        }
        assert_eq!(seen.last().unwrap().transferred, 100);
        assert_eq!(seen.last().unwrap().fraction, 1.0);
    }

    #[tokio::test]
    async fn stops_without_callback_once_cancelled() {
        let cursor = TransferCursor::new(Some(10));
        let (observer, seen) = recorder();
        let stop = CancellationToken::new();
        let handle = ProgressMonitor::spawn(
            cursor.clone(),
            Some(observer),
            Duration::from_millis(50),
            stop.clone(),
        )
        .unwrap();

        stop.cancel();
        handle.await.unwrap();
        cursor.advance(10);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn completion_flushes_final_sample() {
        let cursor = TransferCursor::new(Some(64));
        let (observer, seen) = recorder();
        let stop = CancellationToken::new();
        let handle = ProgressMonitor::spawn(
            cursor.clone(),
            Some(observer),
            Duration::from_secs(60),
            stop.clone(),
        )
        .unwrap();

        cursor.advance(64);
        cursor.mark_complete();
        stop.cancel();
        handle.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ProgressSample::new(64, 64));
    }
}
