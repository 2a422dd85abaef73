use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::time::option_datetime;

/// The gateway's own view of its upstream price API, refreshed by a live test call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub api_connected: bool,
    #[serde(default)]
    pub using_api_key: bool,
    #[serde(default)]
    pub api_key_type: Option<String>,
    #[serde(default)]
    pub last_test_message: Option<String>,
    #[serde(default, with = "option_datetime")]
    pub timestamp: Option<NaiveDateTime>,
}

impl SystemStatus {
    pub fn connection_label(&self) -> &'static str {
        if self.api_connected {
            "Connected"
        } else {
            "Disconnected"
        }
    }

    /// Key tier, or the free tier when the gateway runs without a key.
    pub fn key_label(&self) -> &str {
        self.api_key_type
            .as_deref()
            .filter(|k| !k.is_empty())
            .unwrap_or("None (Free tier)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_connected_status() {
        let json = r#"{
            "usingApiKey": true,
            "apiKeyType": "Demo",
            "timestamp": [2024, 1, 15, 10, 30, 0, 0],
            "apiConnected": true,
            "lastTestMessage": "API working normally"
        }"#;
        let status: SystemStatus = serde_json::from_str(json).unwrap();
        assert!(status.api_connected);
        assert_eq!(status.connection_label(), "Connected");
        assert_eq!(status.key_label(), "Demo");
        assert!(status.timestamp.is_some());
    }

    #[test]
    fn test_failed_probe_without_key() {
        let json = r#"{
            "usingApiKey": false,
            "apiKeyType": null,
            "apiConnected": false,
            "lastTestMessage": "API connection failed: timeout"
        }"#;
        let status: SystemStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.connection_label(), "Disconnected");
        assert_eq!(status.key_label(), "None (Free tier)");
        assert_eq!(status.last_test_message.as_deref(), Some("API connection failed: timeout"));
    }
}
