//! Response envelope codec and failure classification.
//!
//! Every Bot API method answers with `{ok, result, error_code, description}`.
//! Each method is a marker type naming its single result shape, so call sites
//! decode straight into the expected record.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    errors::Error,
    models::{BotInfo, Message, TelegramFile},
    Result,
};

const UNKNOWN_CODE: i64 = -1;
const UNKNOWN_DESCRIPTION: &str = "Unknown error";
const BAD_REQUEST: i64 = 400;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(result: T) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error_code: None,
            description: None,
        }
    }

    pub fn failure(code: i64, description: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error_code: Some(code),
            description: Some(description.into()),
        }
    }

    /// Classify the envelope.
    ///
    /// Order: ok with result, ok without result, code 400, any other failure.
    pub fn into_result(self) -> Result<T> {
        if self.ok {
            return self
                .result
                .ok_or_else(|| Error::Protocol("result is null".to_string()));
        }
        Err(self.failure_error())
    }

    /// The error an `ok=false` envelope maps to.
    pub fn failure_error(&self) -> Error {
        let description = self
            .description
            .clone()
            .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string());
        match self.error_code {
            Some(BAD_REQUEST) => Error::BadRequest {
                code: BAD_REQUEST,
                description,
            },
            code => Error::Remote {
                code: code.unwrap_or(UNKNOWN_CODE),
                description,
            },
        }
    }

    /// Remote error with the envelope's code/description (or the defaults),
    /// regardless of the code. Used for failed file-content responses.
    pub fn remote_error(envelope: Option<Self>) -> Error {
        let (code, description) = envelope
            .map(|e| (e.error_code, e.description))
            .unwrap_or((None, None));
        Error::Remote {
            code: code.unwrap_or(UNKNOWN_CODE),
            description: description.unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string()),
        }
    }
}

/// A Bot API method with exactly one result shape.
pub trait ApiMethod {
    const NAME: &'static str;
    type Output: DeserializeOwned;
}

pub struct GetMe;
pub struct GetFile;
pub struct SendDocument;

impl ApiMethod for GetMe {
    const NAME: &'static str = "getMe";
    type Output = BotInfo;
}

impl ApiMethod for GetFile {
    const NAME: &'static str = "getFile";
    type Output = TelegramFile;
}

impl ApiMethod for SendDocument {
    const NAME: &'static str = "sendDocument";
    type Output = Message;
}

/// Parse a response body for `M` without classifying it.
pub fn parse<M: ApiMethod>(body: &str) -> Result<ApiEnvelope<M::Output>> {
    serde_json::from_str(body).map_err(|e| {
        Error::Protocol(format!("{} response is not a valid envelope: {e}", M::NAME))
    })
}

/// Parse and classify a response body for `M`.
pub fn decode<M: ApiMethod>(body: &str) -> Result<M::Output> {
    parse::<M>(body)?.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_with_result_decodes() {
        let body = r#"{"ok":true,"result":{"id":1,"first_name":"F","username":"u_bot"}}"#;
        let info = decode::<GetMe>(body).unwrap();
        assert_eq!(info.username, "u_bot");
    }

    #[test]
    fn ok_without_result_is_protocol_violation() {
        let err = decode::<GetMe>(r#"{"ok":true}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(ref r) if r == "result is null"));

        let err = decode::<GetMe>(r#"{"ok":true,"result":null}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn code_400_is_bad_request() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: invalid file_id"}"#;
        match decode::<GetFile>(body).unwrap_err() {
            Error::BadRequest { code, description } => {
                assert_eq!(code, 400);
                assert_eq!(description, "Bad Request: invalid file_id");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn other_failures_are_remote_with_defaults() {
        match decode::<SendDocument>(r#"{"ok":false}"#).unwrap_err() {
            Error::Remote { code, description } => {
                assert_eq!(code, -1);
                assert_eq!(description, "Unknown error");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests"}"#;
        assert!(matches!(
            decode::<SendDocument>(body).unwrap_err(),
            Error::Remote { code: 429, .. }
        ));
    }

    #[test]
    fn garbage_is_protocol_violation() {
        let err = decode::<GetFile>("<html>502</html>").unwrap_err();
        assert!(matches!(err, Error::Protocol(ref r) if r.starts_with("getFile")));
    }

    #[test]
    fn remote_error_ignores_bad_request_mapping() {
        let env = ApiEnvelope::<serde_json::Value>::failure(400, "Bad Request: wrong file path");
        assert!(matches!(
            ApiEnvelope::remote_error(Some(env)),
            Error::Remote { code: 400, .. }
        ));
        assert!(matches!(
            ApiEnvelope::<serde_json::Value>::remote_error(None),
            Error::Remote { code: -1, .. }
        ));
    }
}
