use std::fmt;
use url::Url;

use crate::error::{Error, Result};
use crate::models::{ListKey, LogKey};

const WATCHER_PATH: [&str; 4] = ["api", "k8s", "ws", "resource-watcher"];

/// Opaque per-session token carried as `sessionId` on every stream URL.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(***)")
    }
}

/// Base address of the dashboard backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    pub fn parse(input: &str) -> Result<Self> {
        let mut base = Url::parse(input).map_err(|source| Error::InvalidServerUrl {
            url: input.to_string(),
            source,
        })?;

        let scheme = match base.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        };
        if base.scheme() != scheme && base.set_scheme(scheme).is_err() {
            return Err(Error::UnsupportedScheme(base.scheme().to_string()));
        }
        if base.cannot_be_a_base() {
            return Err(Error::CannotBeABase(input.to_string()));
        }
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self { base })
    }

    pub fn resource_list_url(&self, key: &ListKey, session: &SessionCredential) -> Result<Url> {
        self.watcher_url(
            &["list", key.kind.as_str(), key.namespace.as_str()],
            session,
        )
    }

    pub fn pod_logs_url(&self, key: &LogKey, session: &SessionCredential) -> Result<Url> {
        self.watcher_url(
            &[
                "pod-logs",
                key.namespace.as_str(),
                key.pod.as_str(),
                key.container.as_str(),
            ],
            session,
        )
    }

    fn watcher_url(&self, tail: &[&str], session: &SessionCredential) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::CannotBeABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(WATCHER_PATH)
            .extend(tail);
        url.query_pairs_mut()
            .append_pair("sessionId", session.as_str());
        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;

    fn session() -> SessionCredential {
        SessionCredential::new("abc123")
    }

    #[test]
    fn list_url_matches_backend_route() {
        let endpoint = Endpoint::parse("ws://localhost:8080").unwrap();
        let key = ListKey {
            kind: ResourceKind::Pod,
            namespace: "default".into(),
        };
        let url = endpoint.resource_list_url(&key, &session()).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:8080/api/k8s/ws/resource-watcher/list/Pod/default?sessionId=abc123"
        );
    }

    #[test]
    fn blank_namespace_keeps_empty_segment() {
        let endpoint = Endpoint::parse("ws://localhost:8080/").unwrap();
        let key = ListKey {
            kind: ResourceKind::ConfigMap,
            namespace: String::new(),
        };
        let url = endpoint.resource_list_url(&key, &session()).unwrap();
        assert_eq!(url.path(), "/api/k8s/ws/resource-watcher/list/ConfigMap/");
    }

    #[test]
    fn log_url_matches_backend_route() {
        let endpoint = Endpoint::parse("wss://dash.example.com/kube").unwrap();
        let key = LogKey::new("prod", "web-0", "nginx").unwrap();
        let url = endpoint.pod_logs_url(&key, &session()).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://dash.example.com/kube/api/k8s/ws/resource-watcher/pod-logs/prod/web-0/nginx?sessionId=abc123"
        );
    }

    #[test]
    fn segments_are_percent_encoded() {
        let endpoint = Endpoint::parse("ws://localhost:8080").unwrap();
        let key = ListKey {
            kind: ResourceKind::Pod,
            namespace: "a b/c".into(),
        };
        let url = endpoint.resource_list_url(&key, &session()).unwrap();
        assert!(url.path().ends_with("/list/Pod/a%20b%2Fc"));
    }

    #[test]
    fn http_scheme_maps_to_ws() {
        let endpoint = Endpoint::parse("http://localhost:8080").unwrap();
        assert_eq!(endpoint.to_string(), "ws://localhost:8080/");

        let endpoint = Endpoint::parse("https://dash.example.com").unwrap();
        assert_eq!(endpoint.to_string(), "wss://dash.example.com/");
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            Endpoint::parse("ftp://localhost"),
            Err(Error::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            Endpoint::parse("not a url"),
            Err(Error::InvalidServerUrl { .. })
        ));
    }

    #[test]
    fn session_debug_is_redacted() {
        assert_eq!(format!("{:?}", session()), "SessionCredential(***)");
    }

    #[test]
    fn generated_sessions_differ() {
        let a = SessionCredential::generate();
        let b = SessionCredential::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }
}
