use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use image::ImageReader;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::infra::http::{join_url, Transport, TransportError};

pub const PREVIEW_EDGE: u32 = 256;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Fetch(#[from] TransportError),

    #[error("preview request returned HTTP status {0}")]
    Status(u16),

    #[error("failed to decode preview: {0}")]
    Decode(#[from] image::ImageError),

    #[error("preview worker stopped: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPreview {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn decode_preview(bytes: &[u8]) -> Result<DecodedPreview, image::ImageError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    let image = if image.width() > PREVIEW_EDGE || image.height() > PREVIEW_EDGE {
        image.thumbnail(PREVIEW_EDGE, PREVIEW_EDGE)
    } else {
        image
    };
    let rgba = image.to_rgba8();

    Ok(DecodedPreview {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

pub type PreviewResult = (String, Result<DecodedPreview, PreviewError>);

/// Fetches and decodes card previews on the runtime, one request per path.
/// Nothing is fetched until a card asks for it.
pub struct PreviewLoader<T> {
    transport: Arc<T>,
    runtime: Handle,
    base_url: String,
    in_flight: HashSet<String>,
    sender: UnboundedSender<PreviewResult>,
    receiver: UnboundedReceiver<PreviewResult>,
    notify: Arc<dyn Fn() + Send + Sync>,
}

impl<T: Transport> PreviewLoader<T> {
    pub fn new(
        transport: Arc<T>,
        runtime: Handle,
        base_url: impl Into<String>,
        notify: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            transport,
            runtime,
            base_url: base_url.into(),
            in_flight: HashSet::new(),
            sender,
            receiver,
            notify: Arc::new(notify),
        }
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.in_flight.contains(path)
    }

    /// Starts a fetch for `path` unless one is already running.
    pub fn request(&mut self, path: &str) -> bool {
        if !self.in_flight.insert(path.to_string()) {
            return false;
        }

        let transport = Arc::clone(&self.transport);
        let sender = self.sender.clone();
        let notify = Arc::clone(&self.notify);
        let url = join_url(&self.base_url, path);
        let path = path.to_string();

        self.runtime.spawn(async move {
            let result = fetch_preview(transport.as_ref(), &url).await;
            if let Err(error) = &result {
                debug!(%url, %error, "preview unavailable");
            }
            if sender.send((path, result)).is_ok() {
                notify();
            }
        });
        true
    }

    /// Collects every finished preview without blocking.
    pub fn drain(&mut self) -> Vec<PreviewResult> {
        let mut finished = Vec::new();
        while let Ok((path, result)) = self.receiver.try_recv() {
            self.in_flight.remove(&path);
            finished.push((path, result));
        }
        finished
    }

    #[cfg(test)]
    async fn next_finished(&mut self) -> PreviewResult {
        let (path, result) = self
            .receiver
            .recv()
            .await
            .expect("sender is held by the loader");
        self.in_flight.remove(&path);
        (path, result)
    }
}

async fn fetch_preview<T: Transport>(transport: &T, url: &str) -> Result<DecodedPreview, PreviewError> {
    let response = transport.get(url).await?;
    if !response.is_success() {
        return Err(PreviewError::Status(response.status));
    }
    let body = response.body;
    Ok(tokio::task::spawn_blocking(move || decode_preview(&body)).await??)
}
