use crate::gallery::renderer::AssetCard;

#[derive(Debug, Clone)]
pub enum AppEvent {
    SelectCategory(usize),
    RequestPreview(String),
    DownloadAsset(AssetCard),
    ViewAsset(AssetCard),
}
