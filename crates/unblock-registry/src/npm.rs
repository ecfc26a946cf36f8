//! npm registry client

use crate::client::HttpClient;
use crate::error::{Error, Result};
use crate::source::LatestVersionSource;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use url::Url;

/// Public npm registry
pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Abbreviated metadata document; only dist-tags are needed.
const ABBREVIATED_METADATA: &str = "application/vnd.npm.install-v1+json";

/// npm registry API response structure
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(rename = "dist-tags")]
    dist_tags: DistTags,
}

#[derive(Debug, Deserialize)]
struct DistTags {
    latest: Option<String>,
}

/// Latest-version lookups against an npm-compatible registry
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    client: HttpClient,
    base_url: Url,
}

impl NpmRegistry {
    /// Client for the public npm registry
    pub fn new(client: HttpClient) -> Result<Self> {
        Self::with_base_url(client, NPM_REGISTRY_URL)
    }

    /// Client for a mirror or private registry
    pub fn with_base_url(client: HttpClient, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// Registry base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn package_url(&self, package_name: &str) -> Result<String> {
        Ok(self.base_url.join(&encode_package_name(package_name))?.to_string())
    }
}

/// Encode package name for URL (scoped packages keep `@` but escape the slash)
pub fn encode_package_name(package_name: &str) -> String {
    if package_name.starts_with('@') {
        package_name.replacen('/', "%2F", 1)
    } else {
        package_name.to_string()
    }
}

#[async_trait::async_trait]
impl LatestVersionSource for NpmRegistry {
    async fn latest_version(&self, package_name: &str) -> Result<String> {
        if package_name.is_empty() {
            return Err(Error::InvalidPackageName(
                "Package name cannot be empty".to_string(),
            ));
        }

        let url = self.package_url(package_name)?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ABBREVIATED_METADATA));

        let response: NpmPackageResponse = self
            .client
            .get_json_with_headers(&url, headers)
            .await
            .map_err(|e| match e {
                Error::Status { status: 404, .. } => {
                    Error::PackageNotFound(package_name.to_string(), "npm".to_string())
                }
                other => other,
            })?;

        response
            .dist_tags
            .latest
            .ok_or_else(|| Error::PackageNotFound(package_name.to_string(), "npm".to_string()))
    }

    async fn ping(&self) -> Result<()> {
        let url = self.base_url.join("-/ping")?;
        match self.client.get_text(url.as_str()).await {
            Ok(_) => Ok(()),
            Err(e) if no_response(&e) => {
                Err(Error::Unreachable(format!("{}: {}", self.base_url, e)))
            }
            // Some mirrors reject /-/ping but still serve packuments
            Err(e) => {
                tracing::debug!(
                    registry = %self.base_url,
                    error = %e,
                    "ping answered with an error"
                );
                Ok(())
            }
        }
    }
}

/// Transport failures and timeouts, where the registry never answered
fn no_response(error: &Error) -> bool {
    match error {
        Error::Http(e) => e.status().is_none() && !e.is_decode(),
        Error::Timeout(_) => true,
        _ => false,
    }
}
