use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::manifest::models::{Category, Manifest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryResolutionError {
    #[error("category {0:?} is not in the manifest")]
    UnknownCategory(String),

    #[error("category {0:?} has no asset list")]
    MissingAssets(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    NoSelection,
    CategorySelected {
        folder_key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryControl {
    pub index: usize,
    pub label: String,
    pub icon_color: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCard {
    pub file_name: String,
    pub preview_path: String,
    pub download_path: String,
    pub view_path: String,
}

impl AssetCard {
    fn new(asset_root: &str, category: &Category, file_name: &str) -> Self {
        let path = category.asset_path(asset_root, file_name);
        Self {
            file_name: file_name.to_string(),
            preview_path: path.clone(),
            download_path: path.clone(),
            view_path: path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRender {
    generation: u64,
    folder_key: String,
    due: Instant,
}

/// Headless gallery state: which category is active and which cards are on
/// screen. The window draws whatever this holds.
#[derive(Debug)]
pub struct GalleryRenderer {
    manifest: Manifest,
    asset_root: String,
    loading_delay: Duration,
    selection: Selection,
    generation: u64,
    pending: Option<PendingRender>,
    grid: Vec<AssetCard>,
    last_resolution_error: Option<CategoryResolutionError>,
}

impl GalleryRenderer {
    pub fn new(manifest: Manifest, asset_root: impl Into<String>, loading_delay: Duration) -> Self {
        Self {
            manifest,
            asset_root: asset_root.into(),
            loading_delay,
            selection: Selection::NoSelection,
            generation: 0,
            pending: None,
            grid: Vec::new(),
            last_resolution_error: None,
        }
    }

    /// Selects the first category. Does nothing for an empty manifest, in
    /// which case the caller shows the empty-state message.
    pub fn initialize(&mut self, now: Instant) {
        if let Some(first) = self.manifest.get(0).cloned() {
            self.select_category(&first, now);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn grid(&self) -> &[AssetCard] {
        &self.grid
    }

    /// Why the most recent populate left the grid empty, if it failed.
    pub fn last_resolution_error(&self) -> Option<&CategoryResolutionError> {
        self.last_resolution_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn render_controls(&self) -> Vec<CategoryControl> {
        self.manifest
            .categories()
            .iter()
            .enumerate()
            .map(|(index, category)| CategoryControl {
                index,
                label: category.display_name.clone(),
                icon_color: category.icon_color.clone(),
                active: matches!(
                    &self.selection,
                    Selection::CategorySelected { folder_key } if *folder_key == category.folder_key
                ),
            })
            .collect()
    }

    pub fn select(&mut self, index: usize, now: Instant) {
        match self.manifest.get(index).cloned() {
            Some(category) => self.select_category(&category, now),
            None => warn!(index, "ignoring selection of unknown control"),
        }
    }

    pub fn select_category(&mut self, category: &Category, now: Instant) {
        debug!(folder = %category.folder_key, "category selected");
        self.selection = Selection::CategorySelected {
            folder_key: category.folder_key.clone(),
        };
        self.grid.clear();
        self.last_resolution_error = None;
        self.generation += 1;

        if self.loading_delay.is_zero() {
            self.pending = None;
            self.populate(&category.folder_key);
            return;
        }

        self.pending = Some(PendingRender {
            generation: self.generation,
            folder_key: category.folder_key.clone(),
            due: now + self.loading_delay,
        });
    }

    /// Fires the pending render once its delay has elapsed. Returns true when
    /// the grid changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if now < pending.due {
            self.pending = Some(pending);
            return false;
        }
        if pending.generation != self.generation {
            debug!(folder = %pending.folder_key, "dropping superseded render");
            return false;
        }

        self.populate(&pending.folder_key);
        true
    }

    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|pending| pending.due.saturating_duration_since(now))
    }

    fn populate(&mut self, folder_key: &str) {
        match self.resolve(folder_key) {
            Ok(cards) => {
                self.grid = cards;
                self.last_resolution_error = None;
            }
            Err(error) => {
                warn!(%error, "leaving grid empty");
                self.grid.clear();
                self.last_resolution_error = Some(error);
            }
        }
    }

    fn resolve(&self, folder_key: &str) -> Result<Vec<AssetCard>, CategoryResolutionError> {
        let category = self
            .manifest
            .find(folder_key)
            .ok_or_else(|| CategoryResolutionError::UnknownCategory(folder_key.to_string()))?;
        let assets = category
            .assets
            .as_ref()
            .ok_or_else(|| CategoryResolutionError::MissingAssets(folder_key.to_string()))?;

        Ok(assets
            .iter()
            .map(|file_name| AssetCard::new(&self.asset_root, category, file_name))
            .collect())
    }
}
