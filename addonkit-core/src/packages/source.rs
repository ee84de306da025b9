//! Package registries

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PackageError;

/// NuGet v3 flat container, the registry addon packages are published to
pub const DEFAULT_PACKAGE_SOURCE: &str = "https://api.nuget.org/v3-flatcontainer";

/// Read-only package registry
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Every published version of `package_id`
    async fn versions(&self, package_id: &str) -> Result<Vec<String>, PackageError>;

    /// The package archive for one version, held in memory
    async fn download(&self, package_id: &str, version: &str) -> Result<Vec<u8>, PackageError>;
}

#[derive(Debug, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: Vec<String>,
}

/// Registry speaking the flat-container protocol:
///
/// - `{base}/{id}/index.json` lists versions
/// - `{base}/{id}/{version}/{id}.{version}.nupkg` is the archive
///
/// Identifiers and versions are lower-cased in URLs.
pub struct HttpPackageSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPackageSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PackageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn index_url(&self, package_id: &str) -> String {
        format!("{}/{}/index.json", self.base_url, package_id.to_lowercase())
    }

    fn archive_url(&self, package_id: &str, version: &str) -> String {
        let id = package_id.to_lowercase();
        let version = version.to_lowercase();
        format!("{}/{id}/{version}/{id}.{version}.nupkg", self.base_url)
    }
}

#[async_trait]
impl PackageSource for HttpPackageSource {
    async fn versions(&self, package_id: &str) -> Result<Vec<String>, PackageError> {
        let response = self.client.get(self.index_url(package_id)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PackageError::PackageNotFound {
                package: package_id.to_string(),
            });
        }
        let index: VersionIndex = response.error_for_status()?.json().await?;
        Ok(index.versions)
    }

    async fn download(&self, package_id: &str, version: &str) -> Result<Vec<u8>, PackageError> {
        tracing::debug!(package = %package_id, version = %version, "Downloading package");
        let response = self
            .client
            .get(self.archive_url(package_id, version))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PackageError::VersionNotAvailable {
                package: package_id.to_string(),
                version: version.to_string(),
            });
        }
        let bytes = response.error_for_status()?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
