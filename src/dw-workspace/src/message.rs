use serde::Deserialize;
use serde::Serialize;
use tracing::error;

use dw_types::devworkspace::DevWorkspaceSpec;
use dw_types::event::EventSpec;
use dw_types::K8Watch;

use crate::LifecycleError;

/// frame pushed to dashboard clients: `{ "channel": ..., "message": <watch event> }`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "channel", content = "message")]
pub enum PushMessage {
    #[serde(rename = "devWorkspace")]
    DevWorkspace(K8Watch<DevWorkspaceSpec>),
    #[serde(rename = "event")]
    Event(K8Watch<EventSpec>),
}

impl PushMessage {
    pub fn decode(frame: &str) -> Result<Self, LifecycleError> {
        serde_json::from_str(frame).map_err(|err| {
            error!(%err, "push frame could not be decoded");
            err.into()
        })
    }

    pub fn encode(&self) -> Result<String, LifecycleError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn channel(&self) -> &'static str {
        match self {
            Self::DevWorkspace(_) => "devWorkspace",
            Self::Event(_) => "event",
        }
    }
}

#[cfg(test)]
mod test {

    use dw_types::K8Watch;

    use super::PushMessage;

    #[test]
    fn test_decode_devworkspace_frame() {
        let frame = r#"{
            "channel": "devWorkspace",
            "message": {
                "type": "MODIFIED",
                "object": {
                    "apiVersion": "workspace.devfile.io/v1alpha2",
                    "kind": "DevWorkspace",
                    "metadata": { "name": "wksp", "namespace": "user-che", "uid": "u-1", "resourceVersion": "42" },
                    "spec": { "started": true },
                    "status": { "phase": "Starting" }
                }
            }
        }"#;

        let message = PushMessage::decode(frame).expect("frame");
        assert_eq!(message.channel(), "devWorkspace");
        match message {
            PushMessage::DevWorkspace(K8Watch::MODIFIED(dw)) => {
                assert_eq!(dw.metadata.uid, "u-1");
                assert_eq!(dw.status.phase.as_deref(), Some("Starting"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_decode_event_frame() {
        let frame = r#"{
            "channel": "event",
            "message": {
                "type": "ADDED",
                "object": {
                    "metadata": { "name": "pod.1", "namespace": "user-che", "resourceVersion": "7" },
                    "involvedObject": { "kind": "Pod", "uid": "pod-uid" },
                    "reason": "Started",
                    "type": "Normal"
                }
            }
        }"#;

        let message = PushMessage::decode(frame).expect("frame");
        match &message {
            PushMessage::Event(K8Watch::ADDED(event)) => {
                assert_eq!(event.header.reason.as_deref(), Some("Started"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }

        let encoded = message.encode().expect("encode");
        assert!(encoded.starts_with(r#"{"channel":"event","message":{"type":"ADDED""#));
    }

    #[test]
    fn test_unknown_channel() {
        assert!(PushMessage::decode(r#"{"channel":"pods","message":{}}"#).is_err());
    }
}
