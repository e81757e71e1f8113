//! Multipart `sendDocument` with a borrowed, chunk-pumped source.
//!
//! The request body is fed through a bounded channel by the caller's task, so
//! the source never has to be `'static` and only this task reads it. The
//! cursor advances as chunks are handed to the body, at most
//! `QUEUE_DEPTH` chunks ahead of the socket.

use std::io;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    multipart::{Form, Part},
    Body,
};
use tokio::{io::AsyncReadExt, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;

use tgfile_core::{
    domain::ChatId, errors::Error, progress::TransferCursor, transfer::UploadSource, Result,
};

use crate::transport;

const CHUNK_SIZE: usize = 64 * 1024;
const QUEUE_DEPTH: usize = 2;

/// Everything but RFC 3986 unreserved characters.
const FILE_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub(crate) fn encode_file_name(name: &str) -> String {
    utf8_percent_encode(name, FILE_NAME).to_string()
}

/// Send `len` bytes of `stream` and return the raw response body.
pub(crate) async fn send_document(
    http: &reqwest::Client,
    url: String,
    chat_id: ChatId,
    file_name: &str,
    stream: &mut dyn UploadSource,
    len: u64,
    cursor: &TransferCursor,
) -> Result<String> {
    let (tx, rx) = mpsc::channel::<io::Result<Vec<u8>>>(QUEUE_DEPTH);

    let part = Part::stream_with_length(Body::wrap_stream(ReceiverStream::new(rx)), len)
        .file_name(encode_file_name(file_name));
    let form = Form::new()
        .percent_encode_noop()
        .text("chat_id", chat_id.to_string())
        .part("document", part);

    let request = async {
        let resp = http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        resp.text().await.map_err(transport)
    };

    let (pumped, response) = tokio::join!(pump(stream, tx, cursor), request);
    pumped?;
    response
}

/// Copy the source into the body channel until EOF or until the request
/// stops consuming.
async fn pump(
    stream: &mut dyn UploadSource,
    tx: mpsc::Sender<io::Result<Vec<u8>>>,
    cursor: &TransferCursor,
) -> Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) => {
                // Abort the body too, so the request fails instead of hanging.
                let _ = tx.send(Err(io::Error::new(e.kind(), e.to_string()))).await;
                return Err(Error::Io(e));
            }
        };
        if tx.send(Ok(buf[..n].to_vec())).await.is_err() {
            // Request finished or failed without reading the rest.
            return Ok(());
        }
        cursor.advance(n as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_percent_encoded() {
        assert_eq!(encode_file_name("test.txt"), "test.txt");
        assert_eq!(encode_file_name("my report (1).pdf"), "my%20report%20%281%29.pdf");
        assert_eq!(encode_file_name("отчёт.txt"), "%D0%BE%D1%82%D1%87%D1%91%D1%82.txt");
    }

    #[tokio::test]
    async fn pump_stops_when_body_is_dropped() {
        let mut src = std::io::Cursor::new(vec![7u8; CHUNK_SIZE * 8]);
        let cursor = TransferCursor::new(Some((CHUNK_SIZE * 8) as u64));
        let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);

        let reader = async {
            let first = rx.recv().await;
            drop(rx);
            first
        };
        let (pumped, first) = tokio::join!(pump(&mut src, tx, &cursor), reader);

        pumped.unwrap();
        assert_eq!(first.unwrap().unwrap().len(), CHUNK_SIZE);
        assert!(cursor.position() < (CHUNK_SIZE * 8) as u64);
    }
}
