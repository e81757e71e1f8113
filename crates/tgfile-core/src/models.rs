//! Wire records returned inside the API envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{BotId, BotIdentity},
    errors::Error,
};

/// `getMe` result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub first_name: String,
    pub username: String,
}

impl From<BotInfo> for BotIdentity {
    fn from(info: BotInfo) -> Self {
        Self {
            id: BotId(info.id),
            first_name: info.first_name,
            username: info.username,
        }
    }
}

/// A general file sent as a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Bot-dependent id; resolve a download path with `getFile`.
    pub file_id: String,
    /// Stable across bots, cannot be used to download.
    pub file_unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// `sendDocument` result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Unix time.
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

impl Message {
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }
}

/// `getFile` result as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// A file that can be downloaded: `getFile` result with a known path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_size: Option<u64>,
    /// Pass to `download_file`.
    pub file_path: String,
}

impl TryFrom<TelegramFile> for RemoteFile {
    type Error = Error;

    fn try_from(f: TelegramFile) -> Result<Self, Self::Error> {
        let Some(file_path) = f.file_path else {
            return Err(Error::Protocol("result.file_path is null".to_string()));
        };
        Ok(Self {
            file_id: f.file_id,
            file_unique_id: f.file_unique_id,
            file_size: f.file_size,
            file_path,
        })
    }
}
