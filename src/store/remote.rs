//! HTTP client for the hosted backend.
//!
//! Collections live at `/trips/<trip id>/<kind>`: `GET` returns a JSON array
//! (404 when the trip has no collection yet) and `PUT` replaces it.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

use packwise_core::{EntityKind, TripId};

use super::transport::{RemoteTransport, TransportError};
use crate::config::RemoteConfig;

/// Timeout for the health check.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    server_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    /// Creates a new client with explicit parameters.
    pub fn new(server_url: String, api_key: String) -> Self {
        Self {
            server_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Creates a client from config.
    ///
    /// Returns an error if the remote backend is not configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, TransportError> {
        let server_url = config
            .server_url
            .clone()
            .ok_or(TransportError::NotConfigured)?;
        let api_key = config
            .api_key
            .clone()
            .ok_or(TransportError::NotConfigured)?;

        Ok(Self::new(server_url, api_key))
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// URL of a trip's collection. The trip id is percent-encoded as one
    /// path segment.
    fn collection_url(&self, trip_id: &TripId, kind: EntityKind) -> Result<Url, TransportError> {
        let base = build_http_url(&self.server_url, "");
        let mut url =
            Url::parse(&base).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .extend(["trips", trip_id.as_str(), kind.segment()]);
        Ok(url)
    }
}

#[async_trait]
impl RemoteTransport for HttpRemoteStore {
    async fn load(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
    ) -> Result<Option<Value>, TransportError> {
        let response = self
            .client
            .get(self.collection_url(trip_id, kind)?)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(Some(payload))
    }

    async fn save(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
        payload: &Value,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .put(self.collection_url(trip_id, kind)?)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Builds an HTTP(S) URL from a configured server URL.
fn build_http_url(server_url: &str, path: &str) -> String {
    // Convert ws(s) to http(s) if needed
    let base_url = if let Some(rest) = server_url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else if let Some(rest) = server_url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
        format!("http://{}", server_url)
    } else {
        server_url.to_string()
    };

    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Checks whether the backend answers its health endpoint.
pub async fn check_server(server_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(HEALTH_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(build_http_url(server_url, "/health")).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_url() {
        assert_eq!(
            build_http_url("https://api.example.com/", "/health"),
            "https://api.example.com/health"
        );
        assert_eq!(
            build_http_url("wss://api.example.com", "/health"),
            "https://api.example.com/health"
        );
        assert_eq!(
            build_http_url("ws://localhost:8080", "/health"),
            "http://localhost:8080/health"
        );
        assert_eq!(
            build_http_url("localhost:8080", "/health"),
            "http://localhost:8080/health"
        );
    }

    #[test]
    fn test_collection_url() {
        let store = HttpRemoteStore::new("https://api.example.com".into(), "key".into());
        assert_eq!(
            store
                .collection_url(&TripId::new("t1"), EntityKind::PackingItems)
                .unwrap()
                .as_str(),
            "https://api.example.com/trips/t1/packing_items"
        );

        let nested = HttpRemoteStore::new("https://api.example.com/v1/".into(), "key".into());
        assert_eq!(
            nested
                .collection_url(&TripId::new("t1"), EntityKind::Meals)
                .unwrap()
                .as_str(),
            "https://api.example.com/v1/trips/t1/meals"
        );
    }

    #[test]
    fn test_collection_url_encodes_trip_id() {
        let store = HttpRemoteStore::new("https://api.example.com".into(), "key".into());
        let url = store
            .collection_url(&TripId::new("a/b #1?x"), EntityKind::TodoItems)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/trips/a%2Fb%20%231%3Fx/todo_items"
        );
        assert_eq!(url.path_segments().unwrap().count(), 3);
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_collection_url_rejects_unusable_server_url() {
        let store = HttpRemoteStore::new("http://".into(), "key".into());
        assert!(matches!(
            store.collection_url(&TripId::new("t1"), EntityKind::Meals),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = RemoteConfig {
            server_url: Some("https://api.example.com".into()),
            api_key: None,
        };
        assert!(matches!(
            HttpRemoteStore::from_config(&config),
            Err(TransportError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_check_server_unreachable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        assert!(!check_server("http://127.0.0.1:9").await);
    }
}
