//! Shared wire and schema types used across the bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Request envelope
// ---------------------------------------------------------------------------

/// Message kinds accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Invoke a tool that mutates hardware state.
    Exec,
    /// Invoke a read-only tool. Dispatched identically to `exec`; the
    /// distinction is kept for wire compatibility.
    Read,
    /// Register a new tool (an alias over an existing builtin).
    Register,
    /// Introspection: board identity plus the registered tool list.
    Status,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exec => write!(f, "exec"),
            Self::Read => write!(f, "read"),
            Self::Register => write!(f, "register"),
            Self::Status => write!(f, "status"),
        }
    }
}

/// A decoded request. Consumed exactly once by the dispatcher.
#[derive(Debug, Clone)]
pub struct Request {
    pub kind: RequestKind,
    /// Tool name. Present for `exec`/`read`/`register`, absent for `status`.
    pub tool: Option<String>,
    pub params: serde_json::Map<String, Value>,
    /// Correlation token echoed back in the response.
    pub id: Option<Value>,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// A response, written exactly once to the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok {
        data: OkData,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
    Error {
        error: ErrorBody,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkData {
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl Response {
    pub fn ok(result: Value, id: Option<Value>) -> Self {
        Self::Ok {
            data: OkData { result },
            id,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>, id: Option<Value>) -> Self {
        Self::Error {
            error: ErrorBody {
                code,
                message: message.into(),
            },
            id,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Out-of-band event emitted outside the request/response cycle
/// (startup `ready`, frame-overflow notifications).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Structured error codes carried in error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    FrameTooLarge,
    DecodeError,
    MissingField,
    UnsupportedKind,
    ToolNotFound,
    DuplicateTool,
    InvalidParams,
    InvalidSchema,
    HardwareFault,
    OutOfRange,
    BusTimeout,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameTooLarge => write!(f, "FrameTooLarge"),
            Self::DecodeError => write!(f, "DecodeError"),
            Self::MissingField => write!(f, "MissingField"),
            Self::UnsupportedKind => write!(f, "UnsupportedKind"),
            Self::ToolNotFound => write!(f, "ToolNotFound"),
            Self::DuplicateTool => write!(f, "DuplicateTool"),
            Self::InvalidParams => write!(f, "InvalidParams"),
            Self::InvalidSchema => write!(f, "InvalidSchema"),
            Self::HardwareFault => write!(f, "HardwareFault"),
            Self::OutOfRange => write!(f, "OutOfRange"),
            Self::BusTimeout => write!(f, "BusTimeout"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter schemas
// ---------------------------------------------------------------------------

/// Primitive parameter types a tool schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Float,
    Bool,
    Str,
    Bytes,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::Str => write!(f, "str"),
            Self::Bytes => write!(f, "bytes"),
        }
    }
}

impl ParamType {
    /// Whether a JSON value conforms to this type. Integers are accepted
    /// where floats are declared; bytes are arrays of 0..=255 integers.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Int => value.as_i64().is_some(),
            Self::Float => value.as_f64().is_some(),
            Self::Bool => value.is_boolean(),
            Self::Str => value.is_string(),
            Self::Bytes => value.as_array().is_some_and(|items| {
                items
                    .iter()
                    .all(|v| v.as_u64().is_some_and(|n| n <= u8::MAX as u64))
            }),
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
    /// Substituted when an optional parameter is omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, ty: ParamType, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default: Some(default),
        }
    }
}

// ---------------------------------------------------------------------------
// Board identity
// ---------------------------------------------------------------------------

/// Static identity and health figures reported by a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInfo {
    pub board: String,
    pub version: String,
    /// Core clock in Hz.
    pub frequency: u64,
    /// Free-heap estimate in bytes, if the board can report one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_free: Option<u64>,
}

/// GPIO pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    Input,
    Output,
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

impl PinMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" | "in" => Some(Self::Input),
            "output" | "out" => Some(Self::Output),
            _ => None,
        }
    }
}
