use serde::{Deserialize, Serialize};

/// The two states a light can report or be asked to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    On,
    Off,
}

impl LightState {
    pub fn inverse(self) -> Self {
        match self {
            LightState::On => LightState::Off,
            LightState::Off => LightState::On,
        }
    }
}

impl std::fmt::Display for LightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LightState::On => write!(f, "on"),
            LightState::Off => write!(f, "off"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightStatus {
    pub status: LightState,
}

/// One branch of a shadow document. Incoming documents are only read through
/// `reported`; outgoing commands only populate `desired`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported: Option<LightStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired: Option<LightStatus>,
}

/// Wire shape exchanged with the shadow service: `{"state":{...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowDocument {
    pub state: ShadowState,
}

impl ShadowDocument {
    /// A command document carrying only a desired status.
    pub fn desired_update(status: LightState) -> Self {
        Self {
            state: ShadowState {
                reported: None,
                desired: Some(LightStatus { status }),
            },
        }
    }

    pub fn reported_status(&self) -> Option<LightState> {
        self.state.reported.map(|s| s.status)
    }
}

/// Short-lived credentials returned by the identity broker. Never refreshed:
/// once expired the session is not re-authenticated.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
}

/// Lifecycle events surfaced by the realtime transport.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected,
    Interrupted(String),
    Resumed,
    Disconnected,
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_state_wire_form_is_lowercase() {
        assert_eq!(serde_json::to_string(&LightState::On).unwrap(), "\"on\"");
        assert_eq!(
            serde_json::from_str::<LightState>("\"off\"").unwrap(),
            LightState::Off
        );
    }

    #[test]
    fn desired_update_serializes_without_reported_branch() {
        let doc = ShadowDocument::desired_update(LightState::On);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": {"desired": {"status": "on"}}})
        );
    }

    #[test]
    fn reported_status_reads_only_the_reported_branch() {
        let doc: ShadowDocument =
            serde_json::from_str(r#"{"state":{"reported":{"status":"off"}}}"#).unwrap();
        assert_eq!(doc.reported_status(), Some(LightState::Off));

        let doc: ShadowDocument =
            serde_json::from_str(r#"{"state":{"desired":{"status":"on"}}}"#).unwrap();
        assert_eq!(doc.reported_status(), None);
    }
}
