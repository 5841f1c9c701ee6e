//! Device/concept registry client.
//!
//! The repository only needs a handful of read operations from the registry;
//! they are captured by [`RegistryClient`] so the HTTP implementation can be
//! swapped for [`crate::InMemoryRegistry`] in tests and offline runs.
//!
//! ## HTTP endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `list_concept_ids` | `GET {url}/concepts?limit=N&offset=M` (paginated) |
//! | `fetch_concept` | `GET {url}/concepts/{id}` |
//! | `fetch_characteristic` | `GET {url}/characteristics/{id}` |
//! | `list_functions` | `GET {url}/functions?limit=N&offset=M` (paginated) |
//! | `list_aspect_nodes` | `GET {url}/aspect-nodes?limit=N&offset=M` (paginated) |
//! | `fetch_device_type` | `GET {url}/device-types/{id}` |
//! | `fetch_protocol` | `GET {url}/protocols/{id}` |
//!
//! Every request carries `Authorization: Bearer <token>` when a token is
//! configured.

use async_trait::async_trait;
use marshaller_core::config::RegistryConfig;
use marshaller_core::{
    AspectNode, Characteristic, Concept, DeviceType, Function, MarshallerError, Protocol, Result,
};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

/// Read access to the device/concept registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn list_concept_ids(&self) -> Result<Vec<String>>;

    async fn fetch_concept(&self, id: &str) -> Result<Concept>;

    async fn fetch_characteristic(&self, id: &str) -> Result<Characteristic>;

    async fn list_functions(&self) -> Result<Vec<Function>>;

    async fn list_aspect_nodes(&self) -> Result<Vec<AspectNode>>;

    async fn fetch_device_type(&self, id: &str) -> Result<DeviceType>;

    async fn fetch_protocol(&self, id: &str) -> Result<Protocol>;
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

/// [`RegistryClient`] over the registry's REST API.
pub struct HttpRegistryClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    page_size: usize,
}

impl HttpRegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            MarshallerError::Config(format!("invalid registry url '{}': {}", config.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(MarshallerError::Config(format!(
                "registry url '{}' cannot be a base",
                config.url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MarshallerError::Registry(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
            page_size: config.page_size.max(1),
        })
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        kind: &'static str,
        id: &str,
    ) -> Result<T> {
        trace!(category = "registry", url = %url, "GET");
        let mut request = self.client.get(url.clone()).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| MarshallerError::Registry(format!("GET {} failed: {}", url, e)))?;

        match response.status() {
            status if status.is_success() => response.json::<T>().await.map_err(|e| {
                MarshallerError::Registry(format!("invalid response from {}: {}", url, e))
            }),
            StatusCode::NOT_FOUND => Err(MarshallerError::not_found(kind, id)),
            status => Err(MarshallerError::Registry(format!(
                "GET {} returned {}",
                url, status
            ))),
        }
    }

    /// Fetch every page of a listing endpoint.
    async fn list_paginated<T: DeserializeOwned>(&self, resource: &'static str) -> Result<Vec<T>> {
        let url = self.endpoint(&[resource]);
        let mut items = Vec::new();
        let mut offset = 0usize;
        loop {
            let query = [
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ];
            let page: Vec<T> = self.get_json(url.clone(), &query, resource, "").await?;
            let fetched = page.len();
            items.extend(page);
            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }
        debug!(category = "registry", resource, count = items.len(), "Listed registry resource");
        Ok(items)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn list_concept_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<IdOnly> = self.list_paginated("concepts").await?;
        Ok(ids.into_iter().map(|c| c.id).collect())
    }

    async fn fetch_concept(&self, id: &str) -> Result<Concept> {
        self.get_json(self.endpoint(&["concepts", id]), &[], "concept", id)
            .await
    }

    async fn fetch_characteristic(&self, id: &str) -> Result<Characteristic> {
        self.get_json(self.endpoint(&["characteristics", id]), &[], "characteristic", id)
            .await
    }

    async fn list_functions(&self) -> Result<Vec<Function>> {
        self.list_paginated("functions").await
    }

    async fn list_aspect_nodes(&self) -> Result<Vec<AspectNode>> {
        self.list_paginated("aspect-nodes").await
    }

    async fn fetch_device_type(&self, id: &str) -> Result<DeviceType> {
        self.get_json(self.endpoint(&["device-types", id]), &[], "device type", id)
            .await
    }

    async fn fetch_protocol(&self, id: &str) -> Result<Protocol> {
        self.get_json(self.endpoint(&["protocols", id]), &[], "protocol", id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> HttpRegistryClient {
        HttpRegistryClient::new(&RegistryConfig {
            url: url.to_string(),
            ..RegistryConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_encodes_urn_ids() {
        let client = client("http://registry:8080/api/");
        let url = client.endpoint(&["characteristics", "urn:infai:ses:characteristic:1 2"]);
        assert_eq!(
            url.as_str(),
            "http://registry:8080/api/characteristics/urn:infai:ses:characteristic:1%202"
        );
    }

    #[test]
    fn test_endpoint_without_base_path() {
        let client = client("http://registry:8080");
        assert_eq!(
            client.endpoint(&["concepts"]).as_str(),
            "http://registry:8080/concepts"
        );
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let result = HttpRegistryClient::new(&RegistryConfig {
            url: "not a url".to_string(),
            ..RegistryConfig::default()
        });
        assert!(matches!(result, Err(MarshallerError::Config(_))));
    }
}
