/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::error::AppError;
use crate::utils::id::get_id;
use chrono::{SecondsFormat, Utc};
use pretty_simple_display::{DebugPretty, DisplaySimple};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure description of a structured result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorInfo {
    /// Stable error code, see [`AppError::kind`]
    pub kind: String,
    /// Human readable message
    pub message: String,
}

/// Correlation data attached to every result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultMeta {
    /// Unique id of this response
    pub request_id: String,
    /// RFC 3339 timestamp
    pub ts: String,
}

impl ResultMeta {
    fn now() -> Self {
        Self {
            request_id: get_id(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Uniform envelope returned to callers
#[derive(DebugPretty, DisplaySimple, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// True on success
    pub ok: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure on error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Correlation data
    pub meta: ResultMeta,
}

impl ToolResult {
    /// Successful result carrying `data`
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            meta: ResultMeta::now(),
        }
    }

    /// Failed result with an explicit code
    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorInfo {
                kind: kind.into(),
                message: message.into(),
            }),
            meta: ResultMeta::now(),
        }
    }

    /// Failed result describing `error`
    pub fn from_error(error: &AppError) -> Self {
        Self::failure(error.kind(), error.to_string())
    }
}
