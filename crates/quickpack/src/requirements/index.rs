//! Package index port and its PyPI JSON API adapter

use std::{collections::BTreeMap, time::Duration};

use reqwest::{StatusCode, blocking::Client};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, info};
use url::Url;

use super::LookupError;

/// Default timeout for index requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Port listing the released versions of a project (Hexagonal Architecture)
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
pub trait PackageIndex: Send + Sync {
    /// All release version strings published for `name`, in no particular order
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the project is unknown or the index cannot be reached.
    fn release_versions(&self, name: &str) -> Result<Vec<String>, LookupError>;

    /// The dependency lines (`Requires-Dist`) declared by one release of `name`
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the release is unknown or the index cannot be reached.
    fn requires_dist(&self, name: &str, version: &str) -> Result<Vec<String>, LookupError>;
}

#[derive(Debug, Deserialize)]
struct ProjectDocument {
    #[serde(default)]
    releases: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDocument {
    info: ReleaseInfo,
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    #[serde(default)]
    requires_dist: Option<Vec<String>>,
}

/// Queries `{index_url}/pypi/{name}/json`
#[derive(Debug, Clone)]
pub struct PypiIndex {
    client: Client,
    index_url: Url,
}

impl PypiIndex {
    /// Create an index client for `index_url` (e.g. `https://pypi.org`)
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Transport`] if the HTTP client cannot be initialised.
    pub fn new(index_url: Url) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| LookupError::Transport {
                url: index_url.to_string(),
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client, index_url })
    }

    #[must_use]
    pub fn index_url(&self) -> &Url {
        &self.index_url
    }

    /// URL of the JSON document describing `name`
    #[must_use]
    pub fn project_url(&self, name: &str) -> String {
        format!(
            "{}/pypi/{name}/json",
            self.index_url.as_str().trim_end_matches('/')
        )
    }

    /// URL of the JSON document describing release `version` of `name`
    #[must_use]
    pub fn release_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/pypi/{name}/{version}/json",
            self.index_url.as_str().trim_end_matches('/')
        )
    }

    fn fetch<T: DeserializeOwned>(&self, url: &str, name: &str) -> Result<T, LookupError> {
        let transport = |e: reqwest::Error| LookupError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(transport)?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(LookupError::PackageNotFound {
                    name: name.to_string(),
                    index: self.index_url.to_string(),
                });
            }
            status if !status.is_success() => {
                return Err(LookupError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            _ => {}
        }

        response.json().map_err(transport)
    }
}

impl PackageIndex for PypiIndex {
    fn release_versions(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let url = self.project_url(name);
        info!("Fetching release list from {}", url);

        let document: ProjectDocument = self.fetch(&url, name)?;
        debug!(package = name, releases = document.releases.len(), "Fetched release list");

        Ok(document.releases.into_keys().collect())
    }

    fn requires_dist(&self, name: &str, version: &str) -> Result<Vec<String>, LookupError> {
        let url = self.release_url(name, version);
        debug!("Fetching release metadata from {}", url);

        let document: ReleaseDocument = self.fetch(&url, name)?;
        Ok(document.info.requires_dist.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_url_handles_trailing_slash() {
        let index = PypiIndex::new(Url::parse("https://pypi.example.com/").unwrap()).unwrap();

        assert_eq!(
            index.project_url("requests"),
            "https://pypi.example.com/pypi/requests/json"
        );
    }

    #[test]
    fn test_project_document_reads_release_keys() {
        let document: ProjectDocument = serde_json::from_str(
            r#"{"info": {"name": "six"}, "releases": {"1.15.0": [], "1.16.0": [{"yanked": false}]}}"#,
        )
        .unwrap();

        assert_eq!(
            document.releases.into_keys().collect::<Vec<_>>(),
            vec!["1.15.0", "1.16.0"]
        );
    }

    #[test]
    fn test_release_document_without_dependencies() {
        let document: ReleaseDocument =
            serde_json::from_str(r#"{"info": {"name": "six", "requires_dist": null}}"#).unwrap();

        assert_eq!(document.info.requires_dist, None);
        assert_eq!(
            PypiIndex::new(Url::parse("https://pypi.example.com").unwrap())
                .unwrap()
                .release_url("six", "1.16.0"),
            "https://pypi.example.com/pypi/six/1.16.0/json"
        );
    }

    #[test]
    fn test_unreachable_index_is_transport_error() {
        let index = PypiIndex::new(Url::parse("http://127.0.0.1:9").unwrap()).unwrap();

        let err = index.release_versions("six").unwrap_err();

        assert!(matches!(err, LookupError::Transport { .. }));
    }
}
