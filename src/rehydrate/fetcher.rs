// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Image URL resolution and download
//!
//! Pictures referenced by a reconstructed message may be gone from disk by
//! the time the recall arrives. [`ImageFetcher`] is the seam to the image
//! service; [`HttpImageFetcher`] talks to it over HTTP.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{RecallError, Result};
use crate::message::PictureElement;

/// Legacy image host, also used for hash-only lookups
pub const IMAGE_HOST: &str = "https://gchat.qpic.cn";
/// Host serving images that need an rkey
pub const IMAGE_HOST_NT: &str = "https://multimedia.nt.qq.com.cn";

/// App ids whose URLs must be signed with an rkey
const PRIVATE_APPID: &str = "1406";
const GROUP_APPID: &str = "1407";

/// Resolves and downloads picture bytes
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Work out where the picture can be downloaded from
    async fn resolve_url(&self, picture: &PictureElement) -> Option<String>;

    /// Download the bytes at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Which rkey a URL needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RkeyKind {
    Private,
    Group,
}

/// Response body of the rkey server
#[derive(Debug, Clone, Deserialize)]
struct RkeyResponse {
    private_rkey: String,
    group_rkey: String,
    /// Expiry, epoch seconds
    expired_time: i64,
}

#[derive(Debug, Default)]
struct RkeyState {
    private_rkey: String,
    group_rkey: String,
    /// Expiry, epoch milliseconds
    expires_at_ms: i64,
}

impl RkeyState {
    fn get(&self, kind: RkeyKind) -> String {
        match kind {
            RkeyKind::Private => self.private_rkey.clone(),
            RkeyKind::Group => self.group_rkey.clone(),
        }
    }
}

/// How a picture URL should be completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPlan {
    /// The URL is final
    Ready(String),
    /// The URL must be suffixed with a fetched rkey
    NeedsRkey { base: String, kind: RkeyKind },
}

/// Decide how to build the download URL for a picture, without network access
pub fn plan_url(picture: &PictureElement) -> Option<UrlPlan> {
    let origin = match picture.origin_image_url.as_deref() {
        Some(url) if !url.is_empty() => url,
        _ => {
            if picture.md5_hex.is_empty() {
                return None;
            }
            return Some(UrlPlan::Ready(format!(
                "{}/gchatpic_new/0/0-0-{}/0",
                IMAGE_HOST,
                picture.md5_hex.to_uppercase()
            )));
        }
    };

    let full = format!("{}{}", IMAGE_HOST, origin);
    let parsed = match Url::parse(&full) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Unparseable image url {}: {}", origin, e);
            return None;
        }
    };

    let mut appid = None;
    let mut has_rkey = false;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "appid" => appid = Some(value.into_owned()),
            "rkey" if !value.is_empty() => has_rkey = true,
            _ => {}
        }
    }

    let kind = match appid.as_deref() {
        Some(PRIVATE_APPID) => RkeyKind::Private,
        Some(GROUP_APPID) => RkeyKind::Group,
        _ => return Some(UrlPlan::Ready(full)),
    };

    let base = format!("{}{}", IMAGE_HOST_NT, origin);
    if has_rkey {
        Some(UrlPlan::Ready(base))
    } else {
        Some(UrlPlan::NeedsRkey { base, kind })
    }
}

/// [`ImageFetcher`] backed by reqwest
pub struct HttpImageFetcher {
    client: reqwest::Client,
    rkey_server_url: Option<String>,
    rkey_timeout: Duration,
    /// Held across a refresh so only one request is ever in flight
    rkeys: Mutex<RkeyState>,
}

impl HttpImageFetcher {
    pub fn new(rkey_server_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            rkey_server_url,
            rkey_timeout: timeout,
            rkeys: Mutex::new(RkeyState::default()),
        })
    }

    /// Current rkey of the given kind, refreshing it first when expired.
    ///
    /// Concurrent callers wait for the single refresh in progress. A failed
    /// refresh leaves the previous (possibly empty) keys in place.
    pub async fn rkey(&self, kind: RkeyKind) -> String {
        let mut state = self.rkeys.lock().await;
        let now = chrono::Utc::now().timestamp_millis();

        if now <= state.expires_at_ms {
            tracing::debug!("rkey still valid, using cached value");
            return state.get(kind);
        }

        let Some(server) = self.rkey_server_url.as_deref() else {
            tracing::debug!("No rkey server configured");
            return state.get(kind);
        };

        match tokio::time::timeout(self.rkey_timeout, self.request_rkeys(server)).await {
            Ok(Ok(response)) => {
                state.private_rkey = response.private_rkey;
                state.group_rkey = response.group_rkey;
                state.expires_at_ms = response.expired_time.saturating_mul(1000);
                tracing::info!("Refreshed rkeys, valid until {}", response.expired_time);
            }
            Ok(Err(e)) => tracing::warn!("Failed to refresh rkeys: {}", e),
            Err(_) => tracing::warn!("Timed out refreshing rkeys from {}", server),
        }

        state.get(kind)
    }

    async fn request_rkeys(&self, server: &str) -> Result<RkeyResponse> {
        let response = self.client.get(server).send().await?;
        if !response.status().is_success() {
            return Err(RecallError::Fetch(format!(
                "rkey server returned {}",
                response.status()
            )));
        }
        Ok(response.json::<RkeyResponse>().await?)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn resolve_url(&self, picture: &PictureElement) -> Option<String> {
        match plan_url(picture)? {
            UrlPlan::Ready(url) => Some(url),
            UrlPlan::NeedsRkey { base, kind } => {
                let rkey = self.rkey(kind).await;
                Some(format!("{}{}", base, rkey))
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RecallError::Fetch(format!("Download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RecallError::Fetch(format!(
                "Download failed with status: {}",
                response.status()
            )));
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| RecallError::Fetch(format!("Download error: {}", e)))?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}
