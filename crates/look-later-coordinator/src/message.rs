use look_later_core::{LinkKey, LinkRecord};
use serde::{Deserialize, Serialize};

/// Fire-and-forget messages into the coordinator.
///
/// Wire form: `{"type": "link", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Notification {
    /// A link the user right-clicked; becomes the pending capture.
    #[serde(rename = "link")]
    Link(LinkRecord),
    /// A context-menu item was activated.
    #[serde(rename = "menu_click")]
    MenuClick(String),
}

/// Requests that expect a reply.
///
/// Wire form: `{"type": "remove", "payload": "<timestamp key>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Request {
    #[serde(rename = "remove")]
    Remove(LinkKey),
}

/// Reply to [`Request::Remove`]: `{"success": bool}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_notification_wire_form() {
        let json = json!({
            "type": "link",
            "payload": {"timestamp": 5, "href": "https://a.example", "text": "a", "origin": "b.example/c"}
        });

        let message: Notification = serde_json::from_value(json).unwrap();

        assert_eq!(
            message,
            Notification::Link(LinkRecord::new(5, "https://a.example", "a", "b.example/c"))
        );
    }

    #[test]
    fn remove_request_wire_form() {
        let request = Request::Remove(LinkKey::from(1594570000123));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"type": "remove", "payload": "1594570000123"})
        );
    }

    #[test]
    fn remove_response_wire_form() {
        let response: RemoveResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(!response.success);
    }
}
