use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{BotId, BotIdentity},
    models::{Message, RemoteFile},
    transfer::{DownloadSink, TransferOptions, UploadSource},
    Result,
};

/// Hexagonal port for a bot used as file storage.
///
/// The HTTP client implements it; the CLI only talks to this trait.
#[async_trait]
pub trait FileBot: Send + Sync {
    /// Query the bot identity and store it. Must succeed before any transfer.
    async fn initialize(&self, cancel: &CancellationToken) -> Result<BotIdentity>;

    fn is_authorized(&self) -> bool;
    fn id(&self) -> Result<BotId>;
    fn username(&self) -> Result<String>;
    fn identity(&self) -> Result<BotIdentity>;

    /// Upload `stream` as a document named `file_name` to the configured chat.
    async fn send_document(
        &self,
        stream: &mut dyn UploadSource,
        file_name: &str,
        options: TransferOptions,
    ) -> Result<Message>;

    /// Resolve a file id into a downloadable descriptor.
    async fn get_file(&self, file_id: &str, cancel: &CancellationToken) -> Result<RemoteFile>;

    /// Stream the content at `file_path` into `sink`.
    async fn download_file(
        &self,
        sink: &mut dyn DownloadSink,
        file_path: &str,
        options: TransferOptions,
    ) -> Result<()>;
}
