use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    Deployment,
    ConfigMap,
    Job,
    Service,
    Secret,
    HorizontalPodAutoscaler,
    Ingress,
    Endpoints,
    ServiceAccount,
    PersistentVolumeClaim,
    Namespace,
    Node,
    Event,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 14] = [
        ResourceKind::Pod,
        ResourceKind::Deployment,
        ResourceKind::ConfigMap,
        ResourceKind::Job,
        ResourceKind::Service,
        ResourceKind::Secret,
        ResourceKind::HorizontalPodAutoscaler,
        ResourceKind::Ingress,
        ResourceKind::Endpoints,
        ResourceKind::ServiceAccount,
        ResourceKind::PersistentVolumeClaim,
        ResourceKind::Namespace,
        ResourceKind::Node,
        ResourceKind::Event,
    ];

    /// Name used in the watcher URL path.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Job => "Job",
            ResourceKind::Service => "Service",
            ResourceKind::Secret => "Secret",
            ResourceKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::Endpoints => "Endpoints",
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::Namespace => "Namespace",
            ResourceKind::Node => "Node",
            ResourceKind::Event => "Event",
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "po",
            ResourceKind::Deployment => "deploy",
            ResourceKind::ConfigMap => "cm",
            ResourceKind::Job => "job",
            ResourceKind::Service => "svc",
            ResourceKind::Secret => "secret",
            ResourceKind::HorizontalPodAutoscaler => "hpa",
            ResourceKind::Ingress => "ing",
            ResourceKind::Endpoints => "ep",
            ResourceKind::ServiceAccount => "sa",
            ResourceKind::PersistentVolumeClaim => "pvc",
            ResourceKind::Namespace => "ns",
            ResourceKind::Node => "no",
            ResourceKind::Event => "ev",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| {
                let name = kind.as_str().to_ascii_lowercase();
                needle == name
                    || needle == kind.short_name()
                    || needle.strip_suffix('s') == Some(name.as_str())
                    || needle.strip_suffix("es") == Some(name.as_str())
            })
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

/// Lifecycle of one subscription's connection. Only the socket task moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Errored,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Errored => "error",
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Errored)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    #[serde(other)]
    Other,
}

/// Header fields are kept as raw values: the backend is not strict about
/// their types and only a few shapes carry meaning.
#[derive(Deserialize)]
struct EventHeader {
    #[serde(default)]
    name: Option<Value>,
    #[serde(rename = "eventType", default)]
    event_type: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl WatchEventType {
    /// Anything that is not one of the known strings is `Other`.
    fn from_value(value: &Value) -> Self {
        WatchEventType::deserialize(value).unwrap_or(WatchEventType::Other)
    }
}

/// Text of a set `error` field. Null, `false`, `0` and `""` mean unset.
fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// A decoded resource-list frame. `payload` is the frame exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent {
    Error(String),
    Upsert(ResourceSummary),
    Delete(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("frame has no name")]
    MissingName,
}

impl ResourceEvent {
    pub fn from_payload(payload: Value) -> Result<Self, FrameError> {
        if !payload.is_object() {
            return Err(FrameError::NotAnObject);
        }
        let header = EventHeader::deserialize(&payload)?;

        if let Some(error) = header.error.as_ref().and_then(error_text) {
            return Ok(ResourceEvent::Error(error));
        }

        let name = match header.name {
            Some(Value::String(name)) => name,
            _ => return Err(FrameError::MissingName),
        };
        let event_type = header
            .event_type
            .as_ref()
            .map_or(WatchEventType::Other, WatchEventType::from_value);
        match event_type {
            WatchEventType::Deleted => Ok(ResourceEvent::Delete(name)),
            _ => Ok(ResourceEvent::Upsert(ResourceSummary { name, payload })),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSummary {
    pub name: String,
    pub payload: Value,
}

impl ResourceSummary {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListKey {
    pub kind: ResourceKind,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogKey {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

impl LogKey {
    /// All three parts must be known before a log stream can be opened.
    pub fn new(namespace: &str, pod: &str, container: &str) -> Option<Self> {
        if namespace.is_empty() || pod.is_empty() || container.is_empty() {
            return None;
        }
        Some(Self {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamId {
    ResourceList,
    PodLogs,
}

/// Identifies which subscription generation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketTag {
    pub stream: StreamId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    State(ConnectionState),
    Frame(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncEvent {
    pub tag: SocketTag,
    pub event: SocketEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_parses_wire_names() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn kind_parses_plurals_and_short_names() {
        assert_eq!("pods".parse::<ResourceKind>().unwrap(), ResourceKind::Pod);
        assert_eq!("deploy".parse::<ResourceKind>().unwrap(), ResourceKind::Deployment);
        assert_eq!("CM".parse::<ResourceKind>().unwrap(), ResourceKind::ConfigMap);
        assert_eq!("ingresses".parse::<ResourceKind>().unwrap(), ResourceKind::Ingress);
        assert_eq!("pvc".parse::<ResourceKind>().unwrap(), ResourceKind::PersistentVolumeClaim);
        assert_eq!("endpoints".parse::<ResourceKind>().unwrap(), ResourceKind::Endpoints);
    }

    #[test]
    fn kind_rejects_unknown() {
        assert!("widget".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn error_frame_decodes_as_error() {
        let event = ResourceEvent::from_payload(json!({"error": "forbidden"})).unwrap();
        assert_eq!(event, ResourceEvent::Error("forbidden".into()));
    }

    #[test]
    fn empty_error_is_not_an_error() {
        let event =
            ResourceEvent::from_payload(json!({"name": "a", "error": "", "eventType": "ADDED"}))
                .unwrap();
        assert!(matches!(event, ResourceEvent::Upsert(s) if s.name == "a"));
    }

    #[test]
    fn deleted_decodes_as_delete() {
        let event =
            ResourceEvent::from_payload(json!({"name": "p1", "eventType": "DELETED"})).unwrap();
        assert_eq!(event, ResourceEvent::Delete("p1".into()));
    }

    #[test]
    fn missing_or_unknown_event_type_is_upsert() {
        let plain = ResourceEvent::from_payload(json!({"name": "p1"})).unwrap();
        assert!(matches!(plain, ResourceEvent::Upsert(_)));

        let bookmark =
            ResourceEvent::from_payload(json!({"name": "p1", "eventType": "BOOKMARK"})).unwrap();
        assert!(matches!(bookmark, ResourceEvent::Upsert(_)));
    }

    #[test]
    fn upsert_keeps_payload_verbatim() {
        let payload = json!({"name": "p1", "eventType": "ADDED", "status": {"phase": "Running"}});
        let ResourceEvent::Upsert(summary) = ResourceEvent::from_payload(payload.clone()).unwrap()
        else {
            panic!("expected upsert");
        };
        assert_eq!(summary.payload, payload);
    }

    #[test]
    fn non_string_event_type_is_upsert() {
        let numeric = ResourceEvent::from_payload(json!({"name": "p1", "eventType": 3})).unwrap();
        assert!(matches!(numeric, ResourceEvent::Upsert(s) if s.name == "p1"));

        let object =
            ResourceEvent::from_payload(json!({"name": "p1", "eventType": {"kind": "DELETED"}}))
                .unwrap();
        assert!(matches!(object, ResourceEvent::Upsert(_)));

        let lowercase =
            ResourceEvent::from_payload(json!({"name": "p1", "eventType": "deleted"})).unwrap();
        assert!(matches!(lowercase, ResourceEvent::Upsert(_)));
    }

    #[test]
    fn non_string_error_still_counts() {
        let object =
            ResourceEvent::from_payload(json!({"error": {"code": 403}, "name": "p1"})).unwrap();
        assert_eq!(object, ResourceEvent::Error(r#"{"code":403}"#.into()));

        let flag = ResourceEvent::from_payload(json!({"error": true})).unwrap();
        assert_eq!(flag, ResourceEvent::Error("true".into()));
    }

    #[test]
    fn falsy_error_is_ignored() {
        for error in [json!(null), json!(false), json!(0), json!("")] {
            let event =
                ResourceEvent::from_payload(json!({"name": "a", "error": error})).unwrap();
            assert!(matches!(event, ResourceEvent::Upsert(_)), "{error}");
        }
    }

    #[test]
    fn non_object_frame_is_rejected() {
        let err = ResourceEvent::from_payload(json!(["a", "ADDED", "boom"])).unwrap_err();
        assert!(matches!(err, FrameError::NotAnObject));
    }

    #[test]
    fn nameless_frame_is_rejected() {
        let err = ResourceEvent::from_payload(json!({"eventType": "ADDED"})).unwrap_err();
        assert!(matches!(err, FrameError::MissingName));

        let numeric = ResourceEvent::from_payload(json!({"name": 7})).unwrap_err();
        assert!(matches!(numeric, FrameError::MissingName));
    }

    #[test]
    fn log_key_requires_all_parts() {
        assert!(LogKey::new("default", "web", "").is_none());
        assert!(LogKey::new("", "web", "nginx").is_none());
        assert!(LogKey::new("default", "web", "nginx").is_some());
    }

    #[test]
    fn log_event_defaults_missing_fields() {
        let event: LogEvent = serde_json::from_value(json!({"log": "hi"})).unwrap();
        assert_eq!(event.timestamp, "");
        assert_eq!(event.log, "hi");
    }
}
