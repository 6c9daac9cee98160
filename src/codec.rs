//! Wire codec: one frame in, one typed request out; one response in, one
//! delimited line out.
//!
//! Decoding is strict about the envelope (unknown kinds and missing tool
//! names are rejected before the dispatcher ever runs) but follows the
//! wire convention that an absent `type` means `exec`.

use crate::error::BridgeError;
use crate::framing::DELIMITER;
use crate::types::{Event, Request, RequestKind, Response};
use serde::Deserialize;
use serde_json::Value;

/// Raw envelope shape as it appears on the wire.
#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    tool: Option<String>,
    params: Option<serde_json::Map<String, Value>>,
    id: Option<Value>,
}

/// Decode one frame into a request envelope.
pub fn decode_frame(frame: &[u8]) -> Result<Request, BridgeError> {
    let text = std::str::from_utf8(frame)
        .map_err(|_| BridgeError::Decode("frame is not valid UTF-8".into()))?;

    let raw: RawRequest =
        serde_json::from_str(text).map_err(|e| BridgeError::Decode(e.to_string()))?;

    let kind = match raw.kind.as_deref() {
        None | Some("exec") => RequestKind::Exec,
        Some("read") => RequestKind::Read,
        Some("register") => RequestKind::Register,
        Some("status") => RequestKind::Status,
        Some(other) => return Err(BridgeError::UnsupportedKind(other.to_string())),
    };

    let tool = match kind {
        RequestKind::Status => raw.tool,
        _ => Some(raw.tool.ok_or(BridgeError::MissingField("tool"))?),
    };

    Ok(Request {
        kind,
        tool,
        params: raw.params.unwrap_or_default(),
        id: raw.id,
    })
}

/// Serialize a response and append the frame delimiter.
///
/// Infallible by construction: every payload the dispatcher can produce is
/// built from JSON values, so serialization cannot fail.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut line = serde_json::to_vec(response)
        .unwrap_or_else(|_| br#"{"status":"error","error":{"code":"DecodeError","message":"unencodable response"}}"#.to_vec());
    line.push(DELIMITER);
    line
}

/// Serialize an out-of-band event line.
pub fn encode_event(event: &Event) -> Vec<u8> {
    let mut line = serde_json::to_vec(event).unwrap_or_default();
    line.push(DELIMITER);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCode;
    use serde_json::json;

    #[test]
    fn decodes_exec_request() {
        let req = decode_frame(
            br#"{"type":"exec","tool":"gpio_write","params":{"pin":25,"value":1},"id":3}"#,
        )
        .unwrap();
        assert_eq!(req.kind, RequestKind::Exec);
        assert_eq!(req.tool.as_deref(), Some("gpio_write"));
        assert_eq!(req.params["pin"], json!(25));
        assert_eq!(req.id, Some(json!(3)));
    }

    #[test]
    fn absent_type_defaults_to_exec() {
        let req = decode_frame(br#"{"tool":"system_info"}"#).unwrap();
        assert_eq!(req.kind, RequestKind::Exec);
        assert!(req.params.is_empty());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = decode_frame(b"{not json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::DecodeError);
    }

    #[test]
    fn non_utf8_frame_is_a_decode_error() {
        let err = decode_frame(&[0xff, 0xfe, 0x7b]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DecodeError);
    }

    #[test]
    fn exec_without_tool_is_missing_field() {
        let err = decode_frame(br#"{"type":"exec","params":{}}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingField);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = decode_frame(br#"{"type":"subscribe","tool":"x"}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedKind);
    }

    #[test]
    fn status_needs_no_tool() {
        let req = decode_frame(br#"{"type":"status"}"#).unwrap();
        assert_eq!(req.kind, RequestKind::Status);
        assert!(req.tool.is_none());
    }

    #[test]
    fn encoded_response_is_one_terminated_line() {
        let line = encode_response(&Response::ok(json!(1), None));
        assert_eq!(*line.last().unwrap(), b'\n');
        assert_eq!(line.iter().filter(|&&b| b == b'\n').count(), 1);
        let parsed: Value = serde_json::from_slice(&line[..line.len() - 1]).unwrap();
        assert_eq!(parsed["status"], "ok");
    }
}
