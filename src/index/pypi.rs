//! PyPI JSON API client for listing and fetching Python package versions

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::{DEFAULT_PYPI_URL, IndexConfig};
use crate::index::error::IndexError;
use crate::index::registry::PackageIndex;
use crate::index::retry::{RetryPolicy, with_retry};
use crate::index::types::Installable;

const USER_AGENT: &str = concat!("pinpoint/", env!("CARGO_PKG_VERSION"));

/// PyPI index client
pub struct PypiIndex {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl Default for PypiIndex {
    fn default() -> Self {
        Self::new(DEFAULT_PYPI_URL.to_string())
    }
}

impl PypiIndex {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(config.base_url.clone()).with_policy(RetryPolicy::from_config(config))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        not_found: &str,
    ) -> Result<T, IndexError> {
        debug!("Fetching PyPI metadata: {}", url);
        let response = self.client.get(url).send().await?;
        let response = check_status(response, not_found)?;

        response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))
    }
}

/// Map the HTTP status onto the index error taxonomy
fn check_status(response: Response, not_found: &str) -> Result<Response, IndexError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(IndexError::NotFound(not_found.to_string()));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        return Err(IndexError::RateLimited { retry_after_secs });
    }

    if status.is_server_error() {
        return Err(IndexError::Unavailable(format!(
            "PyPI API returned status {}",
            status
        )));
    }

    if !status.is_success() {
        return Err(IndexError::InvalidResponse(format!(
            "PyPI API returned status {}",
            status
        )));
    }

    Ok(response)
}

/// `/pypi/{name}/json`
#[derive(Debug, Deserialize)]
struct ProjectResponse {
    releases: HashMap<String, Vec<ReleaseFile>>,
}

/// `/pypi/{name}/{version}/json`
#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    urls: Vec<ReleaseFile>,
}

#[derive(Debug, Deserialize)]
struct ReleaseFile {
    filename: String,
    url: String,
    #[serde(default)]
    yanked: bool,
}

impl ReleaseFile {
    /// Wheel that installs on any interpreter and platform
    fn is_pure_wheel(&self) -> bool {
        self.filename.ends_with("-none-any.whl")
    }
}

/// A release is installable when at least one of its files is not yanked
fn has_installable_file(files: &[ReleaseFile]) -> bool {
    files.iter().any(|file| !file.yanked)
}

#[async_trait]
impl PackageIndex for PypiIndex {
    async fn list_versions(&self, library: &str) -> Result<Vec<String>, IndexError> {
        let url = format!("{}/pypi/{}/json", self.base_url, library);

        let project: ProjectResponse = with_retry(&self.policy, &url, || {
            self.get_json(&url, library)
        })
        .await?;

        let versions: Vec<String> = project
            .releases
            .into_iter()
            .filter(|(_, files)| has_installable_file(files))
            .map(|(version, _)| version)
            .collect();

        debug!("Found {} versions for package {}", versions.len(), library);

        Ok(versions)
    }

    async fn fetch_installable(
        &self,
        library: &str,
        version: &str,
    ) -> Result<Installable, IndexError> {
        let url = format!("{}/pypi/{}/{}/json", self.base_url, library, version);
        let requirement = format!("{}=={}", library, version);

        let release: ReleaseResponse = with_retry(&self.policy, &url, || {
            self.get_json(&url, &requirement)
        })
        .await?;

        if !has_installable_file(&release.urls) {
            return Err(IndexError::NotFound(requirement));
        }

        let installable = Installable::new(library, version);
        let wheel = release
            .urls
            .into_iter()
            .find(|file| !file.yanked && file.is_pure_wheel());

        Ok(match wheel {
            Some(file) => {
                debug!("Using wheel {} for {}", file.filename, requirement);
                installable.with_artifact_url(file.url)
            }
            None => installable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    fn file(filename: &str, yanked: bool) -> String {
        format!(
            r#"{{"filename": "{0}", "url": "https://files.example/{0}", "yanked": {1}}}"#,
            filename, yanked
        )
    }

    #[tokio::test]
    async fn list_versions_returns_versions_from_releases() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/requests/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{
                    "info": {{"version": "2.32.5"}},
                    "releases": {{
                        "2.31.0": [{}],
                        "2.32.0": [{}],
                        "2.32.5": [{}]
                    }}
                }}"#,
                file("requests-2.31.0-py3-none-any.whl", false),
                file("requests-2.32.0.tar.gz", false),
                file("requests-2.32.5-py3-none-any.whl", false),
            ))
            .create_async()
            .await;

        let index = PypiIndex::new(server.url()).with_policy(fast_policy());
        let mut versions = index.list_versions("requests").await.unwrap();

        mock.assert_async().await;

        versions.sort();
        assert_eq!(versions, vec!["2.31.0", "2.32.0", "2.32.5"]);
    }

    #[tokio::test]
    async fn list_versions_skips_fully_yanked_and_empty_releases() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pypi/django/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{
                    "releases": {{
                        "4.1.0": [{}],
                        "4.2.0": [{}, {}],
                        "4.2.1": [{}],
                        "0.9": []
                    }}
                }}"#,
                file("Django-4.1.0-py3-none-any.whl", false),
                file("Django-4.2.0-py3-none-any.whl", true),
                file("Django-4.2.0.tar.gz", false),
                file("Django-4.2.1-py3-none-any.whl", true),
            ))
            .create_async()
            .await;

        let index = PypiIndex::new(server.url()).with_policy(fast_policy());
        let mut versions = index.list_versions("django").await.unwrap();

        versions.sort();
        assert_eq!(versions, vec!["4.1.0", "4.2.0"]);
    }

    #[tokio::test]
    async fn list_versions_returns_not_found_for_missing_package() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/nonexistent/json")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let index = PypiIndex::new(server.url()).with_policy(fast_policy());
        let result = index.list_versions("nonexistent").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(IndexError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_versions_retries_server_errors_then_reports_unavailable() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/requests/json")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let index = PypiIndex::new(server.url()).with_policy(fast_policy());
        let result = index.list_versions("requests").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(IndexError::Unavailable(_))));
    }

    #[tokio::test]
    async fn list_versions_reports_rate_limit_with_retry_after() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pypi/requests/json")
            .with_status(429)
            .with_header("retry-after", "0")
            .create_async()
            .await;

        let policy = RetryPolicy {
            max_retries: 0,
            ..fast_policy()
        };
        let index = PypiIndex::new(server.url()).with_policy(policy);
        let result = index.list_versions("requests").await;

        assert!(matches!(
            result,
            Err(IndexError::RateLimited {
                retry_after_secs: Some(0)
            })
        ));
    }

    #[tokio::test]
    async fn list_versions_rejects_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pypi/requests/json")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let index = PypiIndex::new(server.url()).with_policy(fast_policy());
        let result = index.list_versions("requests").await;

        assert!(matches!(result, Err(IndexError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn fetch_installable_prefers_pure_wheel() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/requests/2.31.0/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"urls": [{}, {}]}}"#,
                file("requests-2.31.0.tar.gz", false),
                file("requests-2.31.0-py3-none-any.whl", false),
            ))
            .create_async()
            .await;

        let index = PypiIndex::new(server.url()).with_policy(fast_policy());
        let installable = index.fetch_installable("requests", "2.31.0").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            installable,
            Installable::new("requests", "2.31.0")
                .with_artifact_url("https://files.example/requests-2.31.0-py3-none-any.whl")
        );
    }

    #[tokio::test]
    async fn fetch_installable_falls_back_to_requirement_without_pure_wheel() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pypi/numpy/1.26.0/json")
            .with_status(200)
            .with_body(format!(
                r#"{{"urls": [{}, {}]}}"#,
                file("numpy-1.26.0-cp312-cp312-manylinux_2_17_x86_64.whl", false),
                file("numpy-1.26.0.tar.gz", false),
            ))
            .create_async()
            .await;

        let index = PypiIndex::new(server.url()).with_policy(fast_policy());
        let installable = index.fetch_installable("numpy", "1.26.0").await.unwrap();

        assert_eq!(installable.artifact_url, None);
        assert_eq!(installable.install_target(), "numpy==1.26.0");
    }

    #[tokio::test]
    async fn fetch_installable_rejects_fully_yanked_release() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pypi/requests/2.32.0/json")
            .with_status(200)
            .with_body(format!(
                r#"{{"urls": [{}]}}"#,
                file("requests-2.32.0-py3-none-any.whl", true),
            ))
            .create_async()
            .await;

        let index = PypiIndex::new(server.url()).with_policy(fast_policy());
        let result = index.fetch_installable("requests", "2.32.0").await;

        assert!(matches!(result, Err(IndexError::NotFound(ref r)) if r == "requests==2.32.0"));
    }

    #[tokio::test]
    async fn list_versions_handles_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let index = PypiIndex::new(format!("http://{}", addr)).with_policy(fast_policy());
        let result = index.list_versions("requests").await;

        assert!(matches!(result, Err(IndexError::Network(ref e)) if e.is_connect()));
    }

    #[tokio::test]
    async fn list_versions_retries_when_connection_is_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        let server = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        });

        let policy = RetryPolicy {
            max_retries: 3,
            ..fast_policy()
        };
        let index = PypiIndex::new(format!("http://{}", addr)).with_policy(policy);
        let result = index.list_versions("requests").await;
        server.abort();

        assert!(matches!(result, Err(IndexError::Network(_))));
        assert_eq!(accepted.load(Ordering::SeqCst), 4);
    }
}
