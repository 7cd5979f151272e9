// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Picture rehydration for reconstructed messages
//!
//! Rewrites picture paths so the host can display them and re-downloads
//! any image that is no longer on disk. Downloads run in the background;
//! the same content hash is never downloaded twice at once.

mod fetcher;

pub use fetcher::{
    plan_url, HttpImageFetcher, ImageFetcher, RkeyKind, UrlPlan, IMAGE_HOST, IMAGE_HOST_NT,
};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::message::{MessageElement, MessageRecord, PictureElement};

/// Directory, relative to the store, that redirected pictures live in
pub const REDIRECT_DIR_NAME: &str = "redirect_pic";

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Marks one download key as in flight until dropped
struct InFlightClaim {
    set: InFlight,
    key: String,
}

impl InFlightClaim {
    /// Claim `key`, or `None` if another download already holds it
    fn acquire(set: &InFlight, key: &str) -> Option<Self> {
        let mut guard = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !guard.insert(key.to_string()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        let mut guard = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remove(&self.key);
    }
}

/// Rewrites picture paths and schedules missing downloads
pub struct ImageRehydrator {
    fetcher: Arc<dyn ImageFetcher>,
    redirect_dir: PathBuf,
    redirect_pictures: bool,
    in_flight: InFlight,
}

impl ImageRehydrator {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        redirect_dir: impl Into<PathBuf>,
        redirect_pictures: bool,
    ) -> Self {
        Self {
            fetcher,
            redirect_dir: redirect_dir.into(),
            redirect_pictures,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn redirect_dir(&self) -> &Path {
        &self.redirect_dir
    }

    pub fn redirects_pictures(&self) -> bool {
        self.redirect_pictures
    }

    /// Number of downloads currently running
    pub fn downloads_in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .map(|set| set.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    /// Fix up every picture of `record`.
    ///
    /// Returns the rewritten record together with the handles of any
    /// downloads it started. Must be called from within a tokio runtime.
    pub fn rehydrate(&self, mut record: MessageRecord) -> (MessageRecord, Vec<JoinHandle<()>>) {
        let mut downloads = Vec::new();

        for element in record.elements.iter_mut() {
            let MessageElement::Picture(picture) = element else {
                continue;
            };

            self.rewrite_paths(picture);

            if Path::new(&picture.source_path).exists() {
                continue;
            }

            if let Some(handle) = self.spawn_download(picture.clone()) {
                downloads.push(handle);
            }
        }

        (record, downloads)
    }

    fn rewrite_paths(&self, picture: &mut PictureElement) {
        if self.redirect_pictures {
            let file_name = Path::new(&picture.source_path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| picture.file_name.clone());
            picture.source_path = self
                .redirect_dir
                .join(file_name)
                .to_string_lossy()
                .into_owned();
        }

        for thumb in picture.thumb_paths.values_mut() {
            thumb.clone_from(&picture.source_path);
        }
    }

    fn spawn_download(&self, picture: PictureElement) -> Option<JoinHandle<()>> {
        let key = if picture.md5_hex.is_empty() {
            picture.source_path.clone()
        } else {
            picture.md5_hex.clone()
        };

        let Some(claim) = InFlightClaim::acquire(&self.in_flight, &key) else {
            tracing::debug!("Download of {} already in flight", key);
            return None;
        };

        let fetcher = Arc::clone(&self.fetcher);
        Some(tokio::spawn(async move {
            let _claim = claim;
            if let Err(e) = download_picture(fetcher.as_ref(), &picture).await {
                tracing::warn!("Failed to restore picture {}: {}", picture.source_path, e);
            }
        }))
    }
}

async fn download_picture(fetcher: &dyn ImageFetcher, picture: &PictureElement) -> Result<()> {
    let Some(url) = fetcher.resolve_url(picture).await else {
        tracing::debug!("No download url for picture {}", picture.md5_hex);
        return Ok(());
    };

    tracing::debug!("Downloading {} from {}", picture.source_path, url);
    let bytes = fetcher.fetch(&url).await?;

    let dest = Path::new(&picture.source_path);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Write to a temp file first so readers never see a partial image
    let temp = temp_path(dest, &picture.md5_hex);
    tokio::fs::write(&temp, &bytes).await?;
    tokio::fs::rename(&temp, dest).await?;

    tracing::info!("Restored picture {} ({} bytes)", picture.source_path, bytes.len());
    Ok(())
}

/// Download target next to `dest`, unique per file name and content hash
fn temp_path(dest: &Path, md5_hex: &str) -> PathBuf {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.{}.part", file_name, md5_hex))
}
