//! Asset library HTTP client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AssetFetcher, AssetId, AssetMetadata};
use crate::config::InstallerConfig;
use crate::error::FetchError;

/// Subset of the `/asset/{id}` record the installer needs
#[derive(Debug, Deserialize)]
struct AssetDetails {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

/// Looks assets up through the asset library REST API
#[derive(Debug, Clone)]
pub struct AssetLibraryClient {
    client: Client,
    base_url: String,
}

impl AssetLibraryClient {
    pub fn new(config: &InstallerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.metadata_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn asset_url(&self, asset_id: &AssetId) -> String {
        format!("{}/asset/{}", self.base_url, asset_id)
    }
}

#[async_trait]
impl AssetFetcher for AssetLibraryClient {
    async fn fetch_asset_metadata(&self, asset_id: &AssetId) -> Result<AssetMetadata, FetchError> {
        let url = self.asset_url(asset_id);
        debug!("Requesting details for asset ID {}: {}", asset_id, url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Network error fetching details for ID {}: {}", asset_id, e);
            FetchError::Network {
                asset_id: asset_id.clone(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(asset_id.clone()));
        }
        if !status.is_success() {
            return Err(FetchError::Network {
                asset_id: asset_id.clone(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let details: AssetDetails =
            response
                .json()
                .await
                .map_err(|e| FetchError::InvalidResponse {
                    asset_id: asset_id.clone(),
                    message: e.to_string(),
                })?;

        let title = details
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Asset_{}", asset_id));

        debug!("Details received for asset ID {}: '{}'", asset_id, title);
        Ok(AssetMetadata {
            title,
            download_url: details.download_url.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn client_for(server: &MockServer) -> AssetLibraryClient {
        let config = InstallerConfig::builder()
            .api_base_url(format!("{}/api/", server.uri()))
            .user_agent("asset-installer-tests")
            .build();
        AssetLibraryClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_asset_metadata_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/asset/42"))
            .and(header("user-agent", "asset-installer-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "asset_id": "42",
                "title": "Dialogue Manager",
                "download_url": "https://example.com/dm.zip",
                "version_string": "2.0"
            })))
            .mount(&server)
            .await;

        let metadata = client_for(&server)
            .fetch_asset_metadata(&AssetId::from(42u64))
            .await
            .unwrap();

        assert_eq!(metadata.title, "Dialogue Manager");
        assert_eq!(metadata.download_url, "https://example.com/dm.zip");
    }

    #[tokio::test]
    async fn test_fetch_asset_metadata_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/asset/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let metadata = client_for(&server)
            .fetch_asset_metadata(&AssetId::from(9u64))
            .await
            .unwrap();

        assert_eq!(metadata.title, "Asset_9");
        assert!(!metadata.has_download_url());
    }

    #[tokio::test]
    async fn test_fetch_asset_metadata_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/asset/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .fetch_asset_metadata(&AssetId::from(404u64))
            .await;

        assert!(matches!(result, Err(FetchError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_asset_metadata_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/asset/5"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .fetch_asset_metadata(&AssetId::from(5u64))
            .await;

        match result {
            Err(FetchError::Network { message, .. }) => assert_eq!(message, "HTTP 503"),
            other => panic!("Expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_asset_metadata_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/asset/6"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .fetch_asset_metadata(&AssetId::from(6u64))
            .await;

        assert!(matches!(result, Err(FetchError::InvalidResponse { .. })));
    }
}
