use crate::gallery::renderer::GalleryRenderer;

#[derive(Debug, Default)]
pub enum PageState {
    #[default]
    Loading,
    Ready(GalleryRenderer),
    Empty(String),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct AppState {
    pub page: PageState,
    pub status: Option<String>,
}

impl AppState {
    pub fn gallery(&self) -> Option<&GalleryRenderer> {
        match &self.page {
            PageState::Ready(gallery) => Some(gallery),
            _ => None,
        }
    }
}
