//! Inbound frame validation and decoding.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use parley_core::error::AppError;

use super::types::{DmSend, InboundEvent};

/// Raw frame before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Checks size and emptiness of a raw frame.
pub fn validate_inbound(raw: &str, max_bytes: usize) -> Result<(), AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation(format!(
            "Frame exceeds maximum size of {max_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty frame"));
    }

    Ok(())
}

/// Decodes a frame into a typed inbound event.
///
/// Unknown event names and payloads that fail validation are rejected.
pub fn parse_inbound(raw: &str) -> Result<InboundEvent, AppError> {
    let frame: Frame = serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("Malformed frame: {e}")))?;

    match frame.event.as_str() {
        "dm_message" => {
            let payload: DmSend = serde_json::from_value(frame.data)
                .map_err(|e| AppError::validation(format!("Malformed dm_message payload: {e}")))?;
            validate_dm(&payload)?;
            Ok(InboundEvent::DmMessage(payload))
        }
        "heartbeat" => Ok(InboundEvent::Heartbeat),
        other => Err(AppError::validation(format!("Unknown event: '{other}'"))),
    }
}

/// Checks a direct message before anything is stored.
///
/// Content may be any text except the NUL character, which the message
/// store cannot hold.
pub fn validate_dm(dm: &DmSend) -> Result<(), AppError> {
    dm.validate()
        .map_err(|e| AppError::validation(format!("Invalid dm_message payload: {e}")))?;
    if dm.content.contains('\0') {
        return Err(AppError::validation(
            "Invalid dm_message payload: content contains a NUL character",
        ));
    }
    Ok(())
}

/// Resolves the time stamp of an inbound message.
///
/// RFC 3339 strings are honoured as sent; anything else falls back to `now`.
pub fn normalize_time_stamp(raw: Option<&serde_json::Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(serde_json::Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use parley_core::error::ErrorKind;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_dm_with_alias_and_extra_fields() {
        let raw = json!({
            "event": "dm_message",
            "data": {
                "from": "ignored",
                "to": "bob",
                "content": "hello",
                "timestamp": "2024-05-01T10:00:00Z",
                "message": "legacy"
            }
        })
        .to_string();

        let InboundEvent::DmMessage(dm) = parse_inbound(&raw).unwrap() else {
            panic!("expected dm_message");
        };
        assert_eq!(dm.to, "bob");
        assert_eq!(dm.content, "hello");
        assert_eq!(dm.time_stamp, Some(json!("2024-05-01T10:00:00Z")));
    }

    #[test]
    fn test_parse_heartbeat_without_data() {
        assert_eq!(
            parse_inbound(r#"{"event":"heartbeat"}"#).unwrap(),
            InboundEvent::Heartbeat
        );
        assert_eq!(
            parse_inbound(r#"{"event":"heartbeat","data":{}}"#).unwrap(),
            InboundEvent::Heartbeat
        );
    }

    #[test]
    fn test_rejects_unknown_event() {
        let err = parse_inbound(r#"{"event":"typing","data":{}}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_rejects_missing_recipient() {
        assert!(parse_inbound(r#"{"event":"dm_message","data":{"content":"x"}}"#).is_err());
        assert!(parse_inbound(r#"{"event":"dm_message","data":{"to":"","content":"x"}}"#).is_err());
    }

    #[test]
    fn test_rejects_nul_in_content() {
        let raw = json!({
            "event": "dm_message",
            "data": { "to": "bob", "content": "before\u{0}after" }
        })
        .to_string();
        let err = parse_inbound(&raw).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let dm = DmSend {
            to: "bob".to_string(),
            content: "tab\tnewline\n\u{1F600}".to_string(),
            time_stamp: None,
        };
        assert!(validate_dm(&dm).is_ok());
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(parse_inbound("hello there").is_err());
    }

    #[test]
    fn test_validate_inbound_limits() {
        assert!(validate_inbound("{}", 16).is_ok());
        assert!(validate_inbound("   ", 16).is_err());
        assert!(validate_inbound(&"x".repeat(17), 16).is_err());
    }

    #[test]
    fn test_normalize_time_stamp() {
        let now = Utc::now();
        let sent = json!("2024-05-01T12:00:00+02:00");
        assert_eq!(
            normalize_time_stamp(Some(&sent), now).to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
        assert_eq!(normalize_time_stamp(None, now), now);
        assert_eq!(normalize_time_stamp(Some(&json!("yesterday")), now), now);
        assert_eq!(normalize_time_stamp(Some(&json!(1714557600000u64)), now), now);
    }
}
