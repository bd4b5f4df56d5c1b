use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    #[serde(rename = "pasta", alias = "folderKey")]
    pub folder_key: String,
    #[serde(rename = "nome", alias = "displayName")]
    pub display_name: String,
    #[serde(rename = "corIcone", alias = "iconColor", default)]
    pub icon_color: String,
    #[serde(rename = "figurinhas", alias = "assets", default)]
    pub assets: Option<Vec<String>>,
}

impl Category {
    pub fn asset_path(&self, asset_root: &str, file_name: &str) -> String {
        asset_path(asset_root, &self.folder_key, file_name)
    }
}

pub fn asset_path(asset_root: &str, folder_key: &str, file_name: &str) -> String {
    format!("{asset_root}/{folder_key}/{file_name}")
}

/// Ordered, non-empty list of categories as published by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    categories: Vec<Category>,
}

impl Manifest {
    /// Callers are expected to have rejected empty input already; the loader
    /// reports that case as its own error.
    pub(crate) fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    pub fn position(&self, folder_key: &str) -> Option<usize> {
        self.categories
            .iter()
            .position(|category| category.folder_key == folder_key)
    }

    pub fn find(&self, folder_key: &str) -> Option<&Category> {
        self.position(folder_key).and_then(|index| self.get(index))
    }
}
