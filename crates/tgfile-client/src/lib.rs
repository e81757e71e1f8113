//! Telegram Bot API adapter (reqwest).
//!
//! Implements the `tgfile-core` [`FileBot`] port: `getMe`, `getFile`,
//! `sendDocument` and file-content downloads.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tgfile_core::{
    config::{Config, DEFAULT_API_BASE},
    domain::{BotId, BotIdentity, ChatId},
    envelope::{self, ApiEnvelope, ApiMethod, GetFile, GetMe, SendDocument},
    errors::Error,
    models::{Message, RemoteFile},
    ports::FileBot,
    progress::{TransferCursor, DEFAULT_PROGRESS_INTERVAL},
    session::Session,
    transfer::{supervise, validate_upload, DownloadSink, TransferOptions, UploadSource},
    Result,
};

mod download;
mod upload;


const UNAUTHORIZED: i64 = 401;

/// Connection settings for one bot and one destination chat.
#[derive(Clone)]
pub struct ClientConfig {
    token: String,
    chat_id: ChatId,
    api_base: String,
    progress_interval: Duration,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>, chat_id: ChatId) -> Self {
        Self {
            token: token.into(),
            chat_id,
            api_base: DEFAULT_API_BASE.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Point the client at another Bot API server (local server, test mock).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

impl From<&Config> for ClientConfig {
    fn from(cfg: &Config) -> Self {
        Self::new(cfg.bot_token.clone(), cfg.chat_id)
            .with_api_base(cfg.api_base.clone())
            .with_progress_interval(cfg.progress_interval)
    }
}

/// Bot API client used as file storage for a single chat.
pub struct BotClient {
    cfg: ClientConfig,
    http: reqwest::Client,
    session: Session,
}

impl BotClient {
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            cfg,
            http,
            session: Session::new(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.cfg.api_base, self.cfg.token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.cfg.api_base,
            self.cfg.token,
            file_path.trim_start_matches('/')
        )
    }

    /// Form-encoded POST returning the parsed (unclassified) envelope.
    async fn call<M: ApiMethod>(
        &self,
        params: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<ApiEnvelope<M::Output>> {
        debug!(method = M::NAME, "api request");
        let request = async {
            let resp = self
                .http
                .post(self.method_url(M::NAME))
                .form(params)
                .send()
                .await
                .map_err(transport)?;
            resp.text().await.map_err(transport)
        };

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = request => body?,
        };
        envelope::parse::<M>(&body)
    }
}

/// Map a reqwest failure without leaking the token-bearing URL.
pub(crate) fn transport(e: reqwest::Error) -> Error {
    Error::Transport(e.without_url().to_string())
}

#[async_trait]
impl FileBot for BotClient {
    async fn initialize(&self, cancel: &CancellationToken) -> Result<BotIdentity> {
        let me = self.call::<GetMe>(&[], cancel).await?;
        if !me.ok {
            if me.error_code == Some(UNAUTHORIZED) {
                return Err(Error::InvalidCredentials);
            }
            // Any other rejection of getMe is remote, 400 included.
            return Err(ApiEnvelope::remote_error(Some(me)));
        }

        let identity = BotIdentity::from(me.into_result()?);
        self.session.set_identity(identity.clone());
        info!(id = identity.id.0, username = %identity.username, "bot initialized");
        Ok(identity)
    }

    fn is_authorized(&self) -> bool {
        self.session.is_authorized()
    }

    fn id(&self) -> Result<BotId> {
        self.session.id()
    }

    fn username(&self) -> Result<String> {
        self.session.username()
    }

    fn identity(&self) -> Result<BotIdentity> {
        self.session.identity()
    }

    async fn send_document(
        &self,
        stream: &mut dyn UploadSource,
        file_name: &str,
        options: TransferOptions,
    ) -> Result<Message> {
        self.session.identity()?;
        let len = validate_upload(stream).await?;

        let cursor = TransferCursor::new(Some(len));
        let body = supervise(
            cursor.clone(),
            &options,
            self.cfg.progress_interval,
            upload::send_document(
                &self.http,
                self.method_url(SendDocument::NAME),
                self.cfg.chat_id,
                file_name,
                stream,
                len,
                &cursor,
            ),
        )
        .await?;

        let message = envelope::decode::<SendDocument>(&body)?;
        info!(
            message_id = message.message_id,
            bytes = len,
            file_name,
            "document sent"
        );
        Ok(message)
    }

    async fn get_file(&self, file_id: &str, cancel: &CancellationToken) -> Result<RemoteFile> {
        self.session.identity()?;
        let file = self
            .call::<GetFile>(&[("file_id", file_id)], cancel)
            .await?
            .into_result()?;
        RemoteFile::try_from(file)
    }

    async fn download_file(
        &self,
        sink: &mut dyn DownloadSink,
        file_path: &str,
        options: TransferOptions,
    ) -> Result<()> {
        self.session.identity()?;

        let resp = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => return Err(Error::Cancelled),
            resp = self.http.get(self.file_url(file_path)).send() => resp.map_err(transport)?,
        };

        let status = resp.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = options.cancel.cancelled() => return Err(Error::Cancelled),
                body = resp.text() => body.unwrap_or_else(|e| {
                    debug!(error = %e.without_url(), "failed to read error body");
                    String::new()
                }),
            };
            debug!(%status, "file request rejected");
            let env = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body).ok();
            return Err(ApiEnvelope::remote_error(env));
        }

        let cursor = TransferCursor::new(resp.content_length());
        supervise(
            cursor.clone(),
            &options,
            self.cfg.progress_interval,
            download::copy_body(resp, sink, &cursor),
        )
        .await?;

        info!(bytes = cursor.position(), "file downloaded");
        Ok(())
    }
}
