//! Bridge error taxonomy. Every variant maps onto a wire-level error code;
//! nothing here ever escapes the dispatch cycle as a panic.

use crate::hardware::HardwareError;
use crate::types::{ErrorCode, Response};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Frame was not a parseable JSON object (or not UTF-8 at all).
    #[error("invalid JSON: {0}")]
    Decode(String),

    /// A field the envelope requires for this kind was absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The `type` field named a kind the bridge does not speak.
    #[error("unsupported message kind: {0}")]
    UnsupportedKind(String),

    #[error("unknown tool: {0}")]
    ToolNotFound(String),

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    InvalidSchema(String),

    /// Accumulated bytes exceeded the frame bound before a delimiter arrived.
    #[error("frame exceeded {max} bytes without a delimiter")]
    FrameTooLarge { max: usize },

    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

impl BridgeError {
    /// The wire code this failure is reported under.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Decode(_) => ErrorCode::DecodeError,
            Self::MissingField(_) => ErrorCode::MissingField,
            Self::UnsupportedKind(_) => ErrorCode::UnsupportedKind,
            Self::ToolNotFound(_) => ErrorCode::ToolNotFound,
            Self::DuplicateTool(_) => ErrorCode::DuplicateTool,
            Self::InvalidParams(_) => ErrorCode::InvalidParams,
            Self::InvalidSchema(_) => ErrorCode::InvalidSchema,
            Self::FrameTooLarge { .. } => ErrorCode::FrameTooLarge,
            Self::Hardware(e) => match e {
                HardwareError::Fault(_) => ErrorCode::HardwareFault,
                HardwareError::OutOfRange { .. } => ErrorCode::OutOfRange,
                HardwareError::BusTimeout(_) => ErrorCode::BusTimeout,
            },
        }
    }

    /// Convert into the error response written back to the host.
    pub fn into_response(self, id: Option<Value>) -> Response {
        Response::error(self.code(), self.to_string(), id)
    }
}
