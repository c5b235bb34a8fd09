//! Chat request parsing

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of the conversation. Extra fields sent by the UI (ids,
/// timestamps) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Validate a raw `/api/chat` body and extract its messages.
///
/// Checks run in a fixed order so the first problem found is the one
/// reported: empty body, malformed JSON, missing `messages` array, then
/// malformed elements.
pub fn parse_request(body: &[u8]) -> Result<Vec<ChatMessage>, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RelayError::BodyRequired);
    }

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| RelayError::InvalidJson(e.to_string()))?;

    let items = value
        .get("messages")
        .and_then(|m| m.as_array())
        .ok_or(RelayError::MessagesRequired)?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            ChatMessage::deserialize(item).map_err(|e| RelayError::InvalidMessage {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_messages_ignoring_extra_fields() {
        let messages = parse_request(
            br#"{"messages":[
                {"id":"a1","role":"user","content":"status report","createdAt":"now"},
                {"role":"assistant","content":"[ARI] nominal"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(messages, vec![
            ChatMessage::user("status report"),
            ChatMessage::assistant("[ARI] nominal"),
        ]);
    }

    #[test]
    fn test_empty_body() {
        assert!(matches!(parse_request(b""), Err(RelayError::BodyRequired)));
        assert!(matches!(parse_request(b"  \n"), Err(RelayError::BodyRequired)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_request(b"{\"messages\":"), Err(RelayError::InvalidJson(_))));
    }

    #[test]
    fn test_missing_or_non_array_messages() {
        assert!(matches!(parse_request(b"{}"), Err(RelayError::MessagesRequired)));
        assert!(matches!(
            parse_request(br#"{"messages":"hello"}"#),
            Err(RelayError::MessagesRequired)
        ));
        assert!(matches!(parse_request(b"[]"), Err(RelayError::MessagesRequired)));
    }

    #[test]
    fn test_bad_element_reports_index() {
        let err = parse_request(br#"{"messages":[{"role":"user","content":"hi"},{"role":"user"}]}"#)
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidMessage { index: 1, .. }));
    }

    #[test]
    fn test_empty_array_is_accepted() {
        assert!(parse_request(br#"{"messages":[]}"#).unwrap().is_empty());
    }
}
