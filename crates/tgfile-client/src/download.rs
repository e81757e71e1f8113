use tokio::io::AsyncWriteExt;

use tgfile_core::{progress::TransferCursor, transfer::DownloadSink, Result};

use crate::transport;

/// Stream a response body into `sink`, advancing the cursor per chunk.
pub(crate) async fn copy_body(
    mut resp: reqwest::Response,
    sink: &mut dyn DownloadSink,
    cursor: &TransferCursor,
) -> Result<()> {
    while let Some(chunk) = resp.chunk().await.map_err(transport)? {
        sink.write_all(&chunk).await?;
        cursor.advance(chunk.len() as u64);
    }
    sink.flush().await?;
    Ok(())
}
