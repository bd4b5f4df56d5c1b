use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::infra::http::{Transport, TransportError};
use crate::manifest::models::{Category, Manifest};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("manifest request returned HTTP status {status}")]
    Http { status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("manifest is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("manifest contains no categories")]
    EmptyManifest,
}

impl LoadError {
    /// Text shown in place of the gallery.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status } => format!(
                "Could not load the sticker list (HTTP error {status}). Check that the manifest is published next to the assets."
            ),
            Self::Transport(_) => {
                "Could not load the sticker list (HTTP error: server unreachable).".to_string()
            }
            Self::Parse(_) => {
                "The sticker list is malformed. Regenerate the manifest and publish it again."
                    .to_string()
            }
            Self::EmptyManifest => {
                "No sticker categories were found. Run the manifest generator and publish the files."
                    .to_string()
            }
        }
    }
}

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Appends a `v=` parameter unique to this call so no intermediate cache can
/// answer for the manifest.
pub fn cache_busted_url(url: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or_default();
    let sequence = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}v={millis}-{sequence}")
}

pub fn parse_manifest(body: &[u8]) -> Result<Manifest, LoadError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Array(items) = value else {
        return Err(LoadError::EmptyManifest);
    };
    if items.is_empty() {
        return Err(LoadError::EmptyManifest);
    }

    let categories = items
        .into_iter()
        .map(serde_json::from_value::<Category>)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Manifest::new(categories))
}

pub struct ManifestLoader<T> {
    transport: Arc<T>,
    manifest_url: String,
}

impl<T: Transport> ManifestLoader<T> {
    pub fn new(transport: Arc<T>, manifest_url: impl Into<String>) -> Self {
        Self {
            transport,
            manifest_url: manifest_url.into(),
        }
    }

    pub async fn load(&self) -> Result<Manifest, LoadError> {
        let url = cache_busted_url(&self.manifest_url);
        debug!(%url, "fetching manifest");

        let response = self.transport.get(&url).await?;
        if !response.is_success() {
            return Err(LoadError::Http {
                status: response.status,
            });
        }

        let manifest = parse_manifest(&response.body)?;
        info!(categories = manifest.len(), "manifest loaded");
        Ok(manifest)
    }
}
