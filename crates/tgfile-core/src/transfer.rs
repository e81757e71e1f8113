//! Transfer supervision shared by uploads and downloads.
//!
//! [`supervise`] runs the byte-moving future on the caller's task while a
//! [`ProgressMonitor`] observes the shared cursor, and does not return until
//! the monitor task has terminated.

use std::{any::Any, future::Future, io::SeekFrom, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    errors::{Error, ValidationError},
    progress::{ProgressMonitor, ProgressObserver, ProgressSample, TransferCursor},
    Result,
};

/// Largest document the Bot API accepts from bots.
pub const MAX_UPLOAD_SIZE: u64 = 20 * 1024 * 1024;

/// Readable, seekable upload source. Borrowed for the duration of a call.
pub trait UploadSource: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send> UploadSource for T {}

/// Download destination. Borrowed for the duration of a call.
pub trait DownloadSink: AsyncWrite + Unpin + Send {}

impl<T: AsyncWrite + Unpin + Send> DownloadSink for T {}

/// Per-call progress observer and cancellation.
#[derive(Clone, Default)]
pub struct TransferOptions {
    pub progress: Option<ProgressObserver>,
    pub cancel: CancellationToken,
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, observer: impl Fn(ProgressSample) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(observer));
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Check an upload source and return its length, leaving it rewound.
///
/// Order: seekable, non-empty, within [`MAX_UPLOAD_SIZE`], readable. Touches
/// only the local stream.
pub async fn validate_upload<S: UploadSource + ?Sized>(stream: &mut S) -> Result<u64> {
    let len = stream
        .seek(SeekFrom::End(0))
        .await
        .map_err(|_| ValidationError::NotSeekable)?;
    stream
        .seek(SeekFrom::Start(0))
        .await
        .map_err(|_| ValidationError::NotSeekable)?;

    if len == 0 {
        return Err(ValidationError::Empty.into());
    }
    if len > MAX_UPLOAD_SIZE {
        return Err(ValidationError::TooLarge {
            size: len,
            limit: MAX_UPLOAD_SIZE,
        }
        .into());
    }

    let mut probe = [0u8; 1];
    match stream.read(&mut probe).await {
        Ok(1) => {}
        _ => return Err(ValidationError::NotReadable.into()),
    }
    stream
        .seek(SeekFrom::Start(0))
        .await
        .map_err(|_| ValidationError::NotSeekable)?;

    Ok(len)
}

/// Run `op` under progress observation.
///
/// The monitor stops when `op` resolves or when the caller's token fires,
/// whichever comes first, and is joined before returning. Its own
/// cancellation is not an error; a panicking observer surfaces as
/// [`Error::Observer`] and takes precedence over the outcome of `op`.
pub async fn supervise<T, F>(
    cursor: Arc<TransferCursor>,
    options: &TransferOptions,
    interval: Duration,
    op: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let finished = options.cancel.child_token();
    let mut monitor = MonitorGuard {
        stop: finished.clone(),
        handle: ProgressMonitor::spawn(
            cursor.clone(),
            options.progress.clone(),
            interval,
            finished.clone(),
        ),
    };

    let outcome = tokio::select! {
        biased;
        _ = options.cancel.cancelled() => Err(Error::Cancelled),
        r = op => r,
    };

    if outcome.is_ok() {
        cursor.mark_complete();
    }
    finished.cancel();

    match (outcome, monitor.join().await) {
        (outcome, Ok(())) => outcome,
        (Ok(_), Err(e)) => Err(e),
        (Err(primary), Err(e)) => {
            tracing::warn!(error = %primary, "transfer error superseded by observer failure");
            Err(e)
        }
    }
}

/// Stops the monitor on every exit path, including a dropped future.
struct MonitorGuard {
    stop: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl MonitorGuard {
    async fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(Error::Observer(panic_message(e.into_panic()))),
        }
    }
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        self.stop.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "observer panicked".to_string()
}
