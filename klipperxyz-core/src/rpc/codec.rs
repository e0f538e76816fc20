//! # JSON-RPC 2.0 Codec
//!
//! Moonraker speaks JSON-RPC 2.0 over its websocket. This module turns a method call into
//! request text and picks the matching reply out of the incoming message stream.
//!
//! ## How it works
//!
//! 1. **Encoder**: Serializes `{"jsonrpc": "2.0", "method", "params", "id"}`. The `params`
//!    member is left out entirely when the method takes none (e.g. `printer.emergency_stop`).
//!
//! 2. **Decoder**: The server pushes notifications (`notify_status_update`,
//!    `notify_gcode_response`, ...) on the same socket, so a message is only a reply if its
//!    `id` matches the pending request. Everything else is skipped before its shape is
//!    looked at. An error with a `null` id (parse error, invalid request) answers the
//!    pending request, since a transport only has one request in flight.
use super::{Params, transport::CallError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Params>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct Response {
    // `"result": null` is a valid result and must not read as a missing member
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Encodes a request for `method` with the given `id`.
pub fn encode_request(id: u64, method: &str, params: Option<&Params>) -> Result<String, CallError> {
    let request = Request {
        jsonrpc: JSONRPC_VERSION,
        method,
        params,
        id,
    };

    serde_json::to_string(&request)
        .map_err(|e| CallError::Protocol(format!("Failed to serialize request: {e}")))
}

/// Decodes one incoming text message while waiting for the reply to `id`.
///
/// # Returns
///
/// * `Ok(Some(value))` - The message is the successful reply to `id`.
/// * `Ok(None)` - The message is a notification or a reply to another request.
/// * `Err(CallError::Rpc)` - The server answered `id`, or a request it could not read,
///   with an error object.
/// * `Err(CallError::Protocol)` - The message is not JSON, or is a malformed reply to `id`.
pub fn decode_reply(text: &str, id: u64) -> Result<Option<Value>, CallError> {
    let message: Value = serde_json::from_str(text)
        .map_err(|e| CallError::Protocol(format!("Failed to parse message: {e}")))?;

    match message.get("id") {
        Some(Value::Null) if message.get("error").is_some() => {}
        Some(reply_id) if reply_id.as_u64() == Some(id) => {}
        _ => return Ok(None),
    }

    let response = Response::deserialize(message)
        .map_err(|e| CallError::Protocol(format!("Malformed reply: {e}")))?;

    if let Some(error) = response.error {
        return Err(CallError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    response
        .result
        .map(Some)
        .ok_or_else(|| CallError::Protocol("Response missing both result and error".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_request_with_params() {
        let params = json!({ "script": "G28" });
        let text = encode_request(7, "printer.gcode.script", params.as_object()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "method": "printer.gcode.script",
                "params": { "script": "G28" },
                "id": 7
            })
        );
    }

    #[test]
    fn test_encode_request_without_params_omits_member() {
        let text = encode_request(1, "printer.emergency_stop", None).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert!(value.get("params").is_none());
        assert_eq!(value["method"], "printer.emergency_stop");
    }

    #[test]
    fn test_decode_matching_result() {
        let reply = decode_reply(r#"{"jsonrpc":"2.0","result":"ok","id":3}"#, 3).unwrap();
        assert_eq!(reply, Some(json!("ok")));
    }

    #[test]
    fn test_decode_null_result_is_a_result() {
        let reply = decode_reply(r#"{"jsonrpc":"2.0","result":null,"id":3}"#, 3).unwrap();
        assert_eq!(reply, Some(Value::Null));
    }

    #[test]
    fn test_decode_skips_notifications_and_other_ids() {
        let notification =
            r#"{"jsonrpc":"2.0","method":"notify_gcode_response","params":["// busy"]}"#;
        assert_eq!(decode_reply(notification, 3).unwrap(), None);

        let other = r#"{"jsonrpc":"2.0","result":"ok","id":2}"#;
        assert_eq!(decode_reply(other, 3).unwrap(), None);
    }

    #[test]
    fn test_decode_error_object() {
        let text = r#"{"jsonrpc":"2.0","error":{"code":400,"message":"Not homed"},"id":3}"#;

        match decode_reply(text, 3) {
            Err(CallError::Rpc { code, message }) => {
                assert_eq!(code, 400);
                assert_eq!(message, "Not homed");
            }
            other => panic!("Expected Rpc error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_error_without_id_answers_pending_call() {
        let text = r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Bad JSON"},"id":null}"#;

        match decode_reply(text, 1) {
            Err(CallError::Rpc { code, message }) => {
                assert_eq!(code, -32700);
                assert_eq!(message, "Bad JSON");
            }
            other => panic!("Expected Rpc error, got {other:?}"),
        }

        let result = r#"{"jsonrpc":"2.0","result":"ok","id":null}"#;
        assert_eq!(decode_reply(result, 1).unwrap(), None);
    }

    #[test]
    fn test_decode_malformed_reply_to_other_id_is_skipped() {
        let text = r#"{"jsonrpc":"2.0","error":{"code":1},"id":99}"#;

        assert_eq!(decode_reply(text, 1).unwrap(), None);
        assert!(matches!(
            decode_reply(text, 99),
            Err(CallError::Protocol(_))
        ));
    }

    #[test]
    fn test_decode_malformed_messages() {
        assert!(matches!(
            decode_reply("not json", 1),
            Err(CallError::Protocol(_))
        ));
        assert!(matches!(
            decode_reply(r#"{"jsonrpc":"2.0","id":1}"#, 1),
            Err(CallError::Protocol(_))
        ));
    }
}
