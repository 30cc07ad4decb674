// src/core/net.rs
// Retrieval seam. The pipeline only ever asks for "the text at this location";
// which transport answers is decided by the location's scheme.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::consts::{REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::error::{Error, Result};

#[async_trait]
pub trait Fetch: Send + Sync {
    /// Full body of `url` as text. Non-success answers are `Error::Status`,
    /// no answer at all is `Error::Transport`.
    async fn get(&self, url: &str) -> Result<String>;
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// The fetcher for real locations: http(s) → reqwest, anything else is
/// treated as a local path (with or without `file://`). Decided per request,
/// so catalog and override bases may use different schemes.
pub fn default_fetcher() -> Result<Arc<dyn Fetch>> {
    Ok(Arc::new(SchemeFetcher { http: HttpFetcher::new()? }))
}

pub struct SchemeFetcher {
    http: HttpFetcher,
}

#[async_trait]
impl Fetch for SchemeFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        if is_http(url) {
            self.http.get(url).await
        } else {
            FsFetcher.get(url).await
        }
    }
}

/* ---------------- HTTP ---------------- */

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        logd!("GET {url}");
        let transport = |e: reqwest::Error| Error::Transport { url: s!(url), message: e.to_string() };

        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status { url: s!(url), status: status.as_u16() });
        }
        let body = resp.text().await.map_err(transport)?;
        logd!("GET {url}: {} bytes", body.len());
        Ok(body)
    }
}

/* ---------------- Local files ---------------- */

pub struct FsFetcher;

impl FsFetcher {
    fn path_of(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

#[async_trait]
impl Fetch for FsFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        let path = Self::path_of(url);
        logd!("read {}", path.display());
        // Lossy like a browser would be; catalog exports are occasionally not clean UTF-8.
        let bytes = tokio::fs::read(&path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/* ---------------- In-memory ---------------- */

/// Serves canned bodies by exact url. Missing urls answer 404.
/// Counts requests so callers can assert on refetch behaviour.
#[derive(Default)]
pub struct MemoryFetcher {
    bodies: HashMap<String, String>,
    failures: HashMap<String, Error>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Make `url` fail with `err` instead of answering.
    pub fn failing(mut self, url: impl Into<String>, err: Error) -> Self {
        self.failures.insert(url.into(), err);
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        let hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        hits.get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetch for MemoryFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        {
            let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
            *hits.entry(s!(url)).or_default() += 1;
        }
        // Behave like a network call: give other tasks a chance to interleave.
        tokio::task::yield_now().await;

        if let Some(err) = self.failures.get(url) {
            return Err(err.clone());
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Status { url: s!(url), status: 404 })
    }
}
