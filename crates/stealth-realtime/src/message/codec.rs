//! Frame decoding and encoding.

use stealth_core::error::{AppError, ErrorKind};

use super::types::{InboundEvent, OutboundEvent};

/// Parse one inbound text frame.
pub fn decode(frame: &str) -> Result<InboundEvent, AppError> {
    serde_json::from_str(frame).map_err(|e| {
        AppError::with_source(ErrorKind::Validation, format!("Malformed event: {e}"), e)
    })
}

/// Serialize one outbound event.
pub fn encode(event: &OutboundEvent) -> Result<String, AppError> {
    serde_json::to_string(event).map_err(|e| {
        AppError::with_source(ErrorKind::Serialization, "Failed to encode event", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::{SendMessagePayload, UserRef};
    use serde_json::json;
    use stealth_core::types::UserId;
    use stealth_entity::presence::PresenceSnapshot;

    #[test]
    fn test_decode_join_room_forms() {
        let bare = decode(r#"{"event":"join-room","data":"abc"}"#).unwrap();
        assert_eq!(bare, InboundEvent::JoinRoom(UserRef::Id("abc".to_string())));

        let wrapped = decode(r#"{"event":"join-room","data":{"userId":"abc"}}"#).unwrap();
        match wrapped {
            InboundEvent::JoinRoom(user) => assert_eq!(user.as_str(), "abc"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_send_message_camel_case() {
        let frame = json!({
            "event": "send-message",
            "data": {
                "senderId": "a",
                "recipientId": "b",
                "message": "hi",
                "messageType": "text"
            }
        })
        .to_string();
        let event = decode(&frame).unwrap();
        assert_eq!(
            event,
            InboundEvent::SendMessage(SendMessagePayload {
                sender_id: "a".to_string(),
                recipient_id: "b".to_string(),
                message: Some("hi".to_string()),
                message_type: Some("text".to_string()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_decode_unit_event_without_data() {
        let event = decode(r#"{"event":"get-online-users"}"#).unwrap();
        assert_eq!(event, InboundEvent::GetOnlineUsers);
    }

    #[test]
    fn test_decode_rejects_unknown_event() {
        let err = decode(r#"{"event":"drop-table","data":{}}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(decode("not json").is_err());
    }

    #[test]
    fn test_encode_presence_event() {
        let user = UserId::new();
        let frame = encode(&OutboundEvent::UserOffline(PresenceSnapshot::unknown(user))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "user-offline");
        assert_eq!(value["data"]["userId"], user.to_string());
        assert_eq!(value["data"]["isOnline"], false);
        assert!(value["data"]["lastSeen"].is_null());
    }

    #[test]
    fn test_encode_errors() {
        let frame = encode(&OutboundEvent::message_error("NOT_FOUND", "Recipient not found")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "message-error");
        assert_eq!(value["data"]["code"], "NOT_FOUND");
        assert_eq!(value["data"]["error"], "Recipient not found");
    }
}
