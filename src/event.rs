//! Violation events and the logging-endpoint wire format.
//!
//! Every detected anomaly becomes one immutable [`ViolationEvent`], which is
//! simultaneously the POST body for the logging endpoint and the persisted
//! retry-queue entry.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Categories of proctoring events shipped to the logging endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    /// No face visible for consecutive frames
    FaceMissing,
    /// More than one person in frame
    MultipleFaces,
    /// Sustained gaze-down posture
    PhoneUsageSuspected,
    /// Escalation of a repeated violation
    SeriousViolation,
    /// Candidate left the exam surface
    TabSwitch,
    /// Candidate returned to the exam surface
    TabSwitchReturn,
    /// Routine audit-trail check
    RandomCheck,
    /// Periodic screenshot while face estimation is unavailable
    FallbackMonitoring,
    /// A single estimation call failed; the cycle was skipped
    DetectionError,
    /// Monitoring started degraded
    SetupWarning,
    /// Monitoring could not be set up
    SetupFailure,
    /// Monitoring started normally
    MonitorSetup,
}

impl ViolationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCategory::FaceMissing => "face_missing",
            ViolationCategory::MultipleFaces => "multiple_faces",
            ViolationCategory::PhoneUsageSuspected => "phone_usage_suspected",
            ViolationCategory::SeriousViolation => "serious_violation",
            ViolationCategory::TabSwitch => "tab_switch",
            ViolationCategory::TabSwitchReturn => "tab_switch_return",
            ViolationCategory::RandomCheck => "random_check",
            ViolationCategory::FallbackMonitoring => "fallback_monitoring",
            ViolationCategory::DetectionError => "detection_error",
            ViolationCategory::SetupWarning => "setup_warning",
            ViolationCategory::SetupFailure => "setup_failure",
            ViolationCategory::MonitorSetup => "monitor_setup",
        }
    }

    /// JPEG quality tier for attached evidence, or `None` when the category
    /// ships without a screenshot.
    pub fn evidence_quality(&self) -> Option<u8> {
        match self {
            ViolationCategory::FaceMissing | ViolationCategory::TabSwitchReturn => Some(70),
            ViolationCategory::MultipleFaces
            | ViolationCategory::PhoneUsageSuspected
            | ViolationCategory::SeriousViolation => Some(80),
            ViolationCategory::RandomCheck | ViolationCategory::FallbackMonitoring => Some(60),
            ViolationCategory::TabSwitch
            | ViolationCategory::DetectionError
            | ViolationCategory::SetupWarning
            | ViolationCategory::SetupFailure
            | ViolationCategory::MonitorSetup => None,
        }
    }
}

impl std::fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client environment metadata attached to every event.
///
/// Field names are camelCase on the wire, as the endpoint expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub user_agent: String,
    pub platform: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub device_pixel_ratio: f64,
}

impl ClientInfo {
    /// Describe this agent and host for the wire payload.
    pub fn gather(screen_width: u32, screen_height: u32) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            user_agent: format!("proctorwatch/{} ({})", crate::VERSION, std::env::consts::OS),
            platform: host,
            screen_width,
            screen_height,
            device_pixel_ratio: 1.0,
        }
    }
}

/// One detected anomaly, destined for the logging endpoint.
///
/// Immutable once constructed. Consumed by the delivery pipeline and
/// discarded once the endpoint acknowledges it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub session_id: String,
    pub log_type: ViolationCategory,
    pub details: String,
    /// Event creation time, RFC3339
    pub timestamp: String,
    /// JPEG data URL evidence, when the category carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Set when oversized evidence was replaced before persistence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_truncated: Option<bool>,
    pub browser_info: ClientInfo,
    /// Milliseconds since the epoch, for server-side time verification
    pub client_timestamp: i64,
}

impl ViolationEvent {
    pub fn new(
        session_id: &str,
        log_type: ViolationCategory,
        details: String,
        screenshot: Option<String>,
        browser_info: ClientInfo,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.to_string(),
            log_type,
            details,
            timestamp: now.to_rfc3339(),
            screenshot,
            screenshot_truncated: None,
            browser_info,
            client_timestamp: now.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_client() -> ClientInfo {
        ClientInfo {
            user_agent: "proctorwatch/0.0.0 (test)".to_string(),
            platform: "test-host".to_string(),
            screen_width: 640,
            screen_height: 480,
            device_pixel_ratio: 1.0,
        }
    }

    #[test]
    fn test_category_wire_names() {
        let json = serde_json::to_string(&ViolationCategory::PhoneUsageSuspected).unwrap();
        assert_eq!(json, "\"phone_usage_suspected\"");
        assert_eq!(ViolationCategory::TabSwitchReturn.as_str(), "tab_switch_return");
    }

    #[test]
    fn test_evidence_quality_tiers() {
        assert_eq!(ViolationCategory::FaceMissing.evidence_quality(), Some(70));
        assert_eq!(ViolationCategory::MultipleFaces.evidence_quality(), Some(80));
        assert_eq!(ViolationCategory::RandomCheck.evidence_quality(), Some(60));
        assert_eq!(ViolationCategory::TabSwitch.evidence_quality(), None);
    }

    #[test]
    fn test_event_payload_shape() {
        let event = ViolationEvent::new(
            "SESS-1",
            ViolationCategory::TabSwitch,
            "Candidate switched away from the exam tab (occurrence #1)".to_string(),
            None,
            sample_client(),
        );

        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["session_id"], "SESS-1");
        assert_eq!(value["log_type"], "tab_switch");
        // Absent evidence is omitted entirely, not serialized as null
        assert!(value.get("screenshot").is_none());
        assert!(value.get("screenshot_truncated").is_none());
        // Browser metadata keys are camelCase
        assert!(value["browser_info"].get("userAgent").is_some());
        assert!(value["browser_info"].get("devicePixelRatio").is_some());
        assert!(value["client_timestamp"].is_i64());
    }
}
