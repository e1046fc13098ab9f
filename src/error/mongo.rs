use serde::{Deserialize, Serialize};

use crate::error::{DocshellError, QueryError};

/// Structured diagnostic extracted from a MongoDB driver error.
///
/// Attached to a `StoreError` next to the verbatim driver message; it never
/// replaces that message.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDiagnostic {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(rename = "codeName", skip_serializing_if = "Option::is_none")]
    pub code_name: Option<String>,
}

/// Serializable error payload for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
    /// Query text the offset indexes into
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(rename = "callIndex", skip_serializing_if = "Option::is_none")]
    pub call_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<StoreDiagnostic>,
}

impl ErrorInfo {
    /// Convert error info to pretty-printed JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&serde_json::json!({ "error": self }))
    }
}

impl From<&QueryError> for ErrorInfo {
    fn from(err: &QueryError) -> Self {
        Self {
            kind: err.kind.to_string(),
            message: err.message.clone(),
            query: err.query.clone(),
            offset: err.offset,
            call_index: err.call_index,
            diagnostic: err.diagnostic.clone(),
        }
    }
}

impl From<mongodb::error::Error> for QueryError {
    fn from(err: mongodb::error::Error) -> Self {
        QueryError::store(err.to_string()).with_diagnostic(extract_diagnostic(&err))
    }
}

impl From<mongodb::error::Error> for DocshellError {
    fn from(err: mongodb::error::Error) -> Self {
        DocshellError::Query(err.into())
    }
}

/// Extract structured information from a MongoDB error using the driver API.
pub fn extract_diagnostic(error: &mongodb::error::Error) -> StoreDiagnostic {
    use mongodb::error::{ErrorKind, WriteFailure};

    let mut info = StoreDiagnostic::default();

    match error.kind.as_ref() {
        ErrorKind::Write(write_failure) => {
            info.error_type = Some("mongo.write_error".to_string());
            match write_failure {
                WriteFailure::WriteError(write_error) => info.code = Some(write_error.code),
                WriteFailure::WriteConcernError(wc_error) => info.code = Some(wc_error.code),
                _ => {}
            }
        }
        ErrorKind::Command(command_error) => {
            info.error_type = Some("mongo.command_error".to_string());
            info.code = Some(command_error.code);
        }
        ErrorKind::InsertMany(insert_error) => {
            info.error_type = Some("mongo.insert_many_error".to_string());
            if let Some(first) = insert_error.write_errors.as_ref().and_then(|e| e.first()) {
                info.code = Some(first.code);
            } else if let Some(wc_error) = &insert_error.write_concern_error {
                info.code = Some(wc_error.code);
            }
        }
        ErrorKind::Authentication { .. } => {
            info.error_type = Some("mongo.authentication_error".to_string());
        }
        ErrorKind::InvalidArgument { .. } => {
            info.error_type = Some("mongo.invalid_argument".to_string());
        }
        ErrorKind::ServerSelection { .. } => {
            info.error_type = Some("mongo.server_selection_error".to_string());
        }
        _ => {}
    }

    info.code_name = info.code.and_then(code_name);
    info
}

/// Human-readable name for well-known MongoDB error codes.
fn code_name(code: i32) -> Option<String> {
    let name = match code {
        11000 | 11001 => "DuplicateKey",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        50 => "MaxTimeMSExpired",
        121 => "DocumentValidationFailure",
        _ => return None,
    };

    Some(name.to_string())
}
