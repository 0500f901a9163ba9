//! Minimal GitHub REST client for self-hosted runner provisioning.
use crate::defaults::GITHUB_API_VERSION;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const PARTIAL_DOWNLOAD_EXTENSION: &str = "part";

#[derive(thiserror::Error, Debug)]
pub enum GithubError {
    #[error("building http client: `{0}`")]
    Build(String),
    #[error("requesting `{url}`: `{source}`")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("`{url}` answered {status}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },
    #[error("writing `{path}`: `{source}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One entry of the runner application downloads list.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RunnerDownload {
    pub os: String,
    pub architecture: String,
    pub download_url: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
struct RegistrationToken {
    token: String,
}

pub struct GithubClient {
    client: Client,
    api_url: String,
}

impl GithubClient {
    pub fn try_new(api_url: &str, token: &str) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
        headers.insert(
            API_VERSION_HEADER,
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let mut auth_header_value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| GithubError::Build(format!("invalid token: {e}")))?;
        auth_header_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header_value);

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GithubError::Build(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn runner_downloads(&self, org: &str) -> Result<Vec<RunnerDownload>, GithubError> {
        let url = format!("{}/orgs/{org}/actions/runners/downloads", self.api_url);
        let response = self.send(&url, self.client.get(&url))?;
        let response = expect_status(&url, response, StatusCode::OK)?;
        response
            .json()
            .map_err(|source| GithubError::Request { url, source })
    }

    pub fn registration_token(&self, org: &str) -> Result<String, GithubError> {
        let url = format!(
            "{}/orgs/{org}/actions/runners/registration-token",
            self.api_url
        );
        let response = self.send(&url, self.client.post(&url))?;
        let response = expect_status(&url, response, StatusCode::CREATED)?;
        let token: RegistrationToken = response
            .json()
            .map_err(|source| GithubError::Request { url, source })?;
        Ok(token.token)
    }

    /// Downloads `url` into `destination`. The content lands in a sibling partial file first so an
    /// interrupted download never looks complete.
    pub fn download(&self, url: &str, destination: &Path) -> Result<(), GithubError> {
        // Release assets live outside the API, the token must not travel there.
        let request = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GithubError::Build(e.to_string()))?
            .get(url);
        let response = self.send(url, request)?;
        let mut response = expect_status(url, response, StatusCode::OK)?;

        let partial = destination.with_extension(PARTIAL_DOWNLOAD_EXTENSION);
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| GithubError::Io { path, source }
        };

        let mut file = File::create(&partial).map_err(io_error(&partial))?;
        response
            .copy_to(&mut file)
            .map_err(|source| GithubError::Request {
                url: url.to_string(),
                source,
            })?;
        fs::rename(&partial, destination).map_err(io_error(destination))?;
        debug!(url, destination = %destination.display(), "Download completed");
        Ok(())
    }

    fn send(
        &self,
        url: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Response, GithubError> {
        debug!(url, "Sending request");
        request.send().map_err(|source| GithubError::Request {
            url: url.to_string(),
            source,
        })
    }
}

fn expect_status(url: &str, response: Response, expected: StatusCode) -> Result<Response, GithubError> {
    if response.status() == expected {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    Err(GithubError::UnexpectedStatus {
        url: url.to_string(),
        status,
        body,
    })
}
