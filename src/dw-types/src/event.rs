//!
//! # Event
//!
//! core/v1 Event. Events carry their fields at top level, so they live in the header
//! and the spec is empty.
//!
use serde::Deserialize;
use serde::Serialize;

use crate::{Crd, CrdNames, Header, Spec, Status};

const EVENT_API: Crd = Crd {
    group: "core",
    version: "v1",
    names: CrdNames {
        kind: "Event",
        plural: "events",
        singular: "event",
    },
};

pub type K8Event = crate::K8Obj<EventSpec>;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct EventSpec {}

impl Spec for EventSpec {
    type Status = EventStatus;
    type Header = EventHeader;

    fn metadata() -> &'static Crd {
        &EVENT_API
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct EventStatus {}

impl Status for EventStatus {}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EventHeader {
    pub involved_object: ObjectReference,
    pub reason: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub count: Option<u32>,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
}

impl Header for EventHeader {}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectReference {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub uid: Option<String>,
}

#[cfg(test)]
mod test {

    use super::K8Event;

    #[test]
    fn test_decode_event() {
        let data = r#"
        {
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": { "name": "workspace-pod.17a", "namespace": "user-che", "resourceVersion": "88" },
            "involvedObject": { "kind": "Pod", "name": "workspace-pod", "uid": "pod-uid" },
            "reason": "Pulling",
            "message": "Pulling image \"quay.io/devfile/universal-developer-image\"",
            "type": "Normal",
            "count": 1
        }"#;

        let event: K8Event = serde_json::from_str(data).expect("event");
        assert_eq!(event.header.reason.as_deref(), Some("Pulling"));
        assert_eq!(event.header.ty.as_deref(), Some("Normal"));
        assert_eq!(event.header.involved_object.name.as_deref(), Some("workspace-pod"));
        assert_eq!(event.metadata.resource_version, "88");
    }
}
