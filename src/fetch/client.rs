// src/fetch/client.rs
//! Blocking HTTP client for resource downloads.
//!
//! A thin wrapper around `reqwest::blocking`: bounded redirects, a request
//! timeout, transport errors classified into [`FetchFailure`] and transient
//! ones retried with backoff.

use super::{FetchedResource, ResourceSource};
use crate::constants::{FETCH_MAX_REDIRECTS, FETCH_TIMEOUT_SECS};
use crate::error::{AppError, FetchFailure};
use crate::error_recovery::RetryPolicy;
use reqwest::blocking::Client;
use reqwest::{header, redirect};
use std::time::Duration;

const USER_AGENT: &str = concat!("md2channel/", env!("CARGO_PKG_VERSION"));

/// Downloads resources over HTTP(S).
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(retry: RetryPolicy) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .redirect(redirect::Policy::limited(FETCH_MAX_REDIRECTS))
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, retry })
    }

    /// One GET, no retries.
    fn fetch_once(&self, url: &str) -> Result<FetchedResource, FetchFailure> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchFailure::from_transport(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::from_status(url, status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();

        let bytes = response
            .bytes()
            .map_err(|e| FetchFailure::from_transport(url, &e))?;
        log::debug!(
            "Fetched {} ({} bytes, {})",
            url,
            bytes.len(),
            content_type.as_deref().unwrap_or("no content type")
        );

        Ok(FetchedResource {
            bytes: bytes.to_vec(),
            content_type,
            cookies,
        })
    }
}

impl ResourceSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchFailure> {
        self.retry.run(|| self.fetch_once(url))
    }
}
