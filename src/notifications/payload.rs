//! Notification payload shape shared with the frontend service worker.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Icon and badge path served by the reservation frontend.
const DEFAULT_ICON: &str = "/vite.svg";

/// Vibration pattern the service worker passes to the Notification API.
const DEFAULT_VIBRATION: [u32; 3] = [200, 100, 200];

/// The JSON object encrypted into each push message.
///
/// Constructed per send and never persisted. Field names are the contract
/// with the service worker's `showNotification` call, so
/// `require_interaction` serializes in camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub body: String,
    /// Icon shown next to the notification.
    pub icon: String,
    /// Badge shown in the status bar on mobile.
    pub badge: String,
    /// Vibration pattern (milliseconds on/off/on).
    pub vibrate: Vec<u32>,
    /// Arbitrary key/value data forwarded to the click handler.
    #[serde(default)]
    pub data: HashMap<String, String>,
    /// Keep the notification on screen until the user interacts with it.
    #[serde(rename = "requireInteraction")]
    pub require_interaction: bool,
}

impl NotificationPayload {
    /// Build a payload with the frontend's default icon, badge, and
    /// vibration pattern.
    pub fn new(title: &str, body: &str, data: Option<HashMap<String, String>>) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_ICON.to_string(),
            vibrate: DEFAULT_VIBRATION.to_vec(),
            data: data.unwrap_or_default(),
            require_interaction: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_frontend_contract() {
        let payload = NotificationPayload::new("Route Open", "Seats available", None);
        assert_eq!(payload.icon, "/vite.svg");
        assert_eq!(payload.badge, "/vite.svg");
        assert_eq!(payload.vibrate, vec![200, 100, 200]);
        assert!(payload.require_interaction);
        assert!(payload.data.is_empty());
    }

    #[test]
    fn test_require_interaction_serializes_camel_case() {
        let payload = NotificationPayload::new("t", "b", None);
        let json = serde_json::to_string(&payload).expect("serialize");
        assert!(json.contains("\"requireInteraction\":true"));
        assert!(!json.contains("require_interaction"));
    }

    #[test]
    fn test_data_map_round_trips() {
        let mut data = HashMap::new();
        data.insert("route_name".to_string(), "Main Gate Express".to_string());
        let payload = NotificationPayload::new("t", "b", Some(data));

        let json = serde_json::to_string(&payload).expect("serialize");
        let loaded: NotificationPayload = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loaded.data.get("route_name").map(String::as_str), Some("Main Gate Express"));
    }
}
