use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::state::{AppState, PageState};
use crate::cache::downloads::{download_asset, DownloadError};
use crate::cache::previews::{PreviewLoader, PreviewResult};
use crate::gallery::renderer::GalleryRenderer;
use crate::infra::config::AppConfig;
use crate::infra::http::{join_url, Transport};
use crate::manifest::loader::{LoadError, ManifestLoader};
use crate::manifest::models::Manifest;

type Notify = Arc<dyn Fn() + Send + Sync>;
type DownloadResult = (String, Result<PathBuf, DownloadError>);

/// What the window needs to act on after a frame's worth of background work.
#[derive(Default)]
pub struct FrameUpdate {
    pub previews: Vec<PreviewResult>,
    pub open_urls: Vec<String>,
    pub next_wake: Option<Duration>,
}

pub struct ApplicationController<T> {
    config: AppConfig,
    state: AppState,
    transport: Arc<T>,
    runtime: Handle,
    notify: Notify,
    manifest: Option<oneshot::Receiver<Result<Manifest, LoadError>>>,
    previews: PreviewLoader<T>,
    download_sender: UnboundedSender<DownloadResult>,
    download_receiver: UnboundedReceiver<DownloadResult>,
    open_urls: Vec<String>,
}

impl<T: Transport> ApplicationController<T> {
    pub fn new(
        config: AppConfig,
        transport: Arc<T>,
        runtime: Handle,
        notify: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let notify: Notify = Arc::new(notify);
        let preview_notify = Arc::clone(&notify);
        let previews = PreviewLoader::new(
            Arc::clone(&transport),
            runtime.clone(),
            config.base_url.clone(),
            move || preview_notify(),
        );
        let (download_sender, download_receiver) = unbounded_channel();

        Self {
            config,
            state: AppState::default(),
            transport,
            runtime,
            notify,
            manifest: None,
            previews,
            download_sender,
            download_receiver,
            open_urls: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn is_preview_pending(&self, path: &str) -> bool {
        self.previews.is_pending(path)
    }

    /// Starts the manifest fetch. The page stays in `Loading` until `poll`
    /// sees the result.
    pub fn bootstrap(&mut self) {
        let loader = ManifestLoader::new(Arc::clone(&self.transport), self.config.manifest_url());
        let notify = Arc::clone(&self.notify);
        let (sender, receiver) = oneshot::channel();

        self.runtime.spawn(async move {
            let result = loader.load().await;
            if sender.send(result).is_ok() {
                notify();
            }
        });

        self.manifest = Some(receiver);
        self.state.page = PageState::Loading;
    }

    pub fn apply_manifest(&mut self, result: Result<Manifest, LoadError>, now: Instant) {
        self.state.page = match result {
            Ok(manifest) => {
                let mut gallery = GalleryRenderer::new(
                    manifest,
                    self.config.asset_root.clone(),
                    self.config.loading_delay,
                );
                gallery.initialize(now);
                PageState::Ready(gallery)
            }
            Err(LoadError::EmptyManifest) => {
                warn!("manifest has no categories");
                PageState::Empty(LoadError::EmptyManifest.user_message())
            }
            Err(error) => {
                error!(%error, "failed to load manifest");
                PageState::Failed(error.user_message())
            }
        };
    }

    pub fn poll(&mut self, now: Instant) -> FrameUpdate {
        if let Some(receiver) = self.manifest.as_mut() {
            match receiver.try_recv() {
                Ok(result) => {
                    self.manifest = None;
                    self.apply_manifest(result, now);
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.manifest = None;
                    error!("manifest task ended without a result");
                    self.state.page =
                        PageState::Failed("The sticker list could not be loaded.".to_string());
                }
            }
        }

        let mut next_wake = None;
        if let PageState::Ready(gallery) = &mut self.state.page {
            gallery.tick(now);
            next_wake = gallery.next_wake(now);
        }

        while let Ok((file_name, result)) = self.download_receiver.try_recv() {
            self.state.status = Some(match result {
                Ok(path) => {
                    info!(path = %path.display(), "download saved");
                    format!("Saved {file_name} to {}", path.display())
                }
                Err(error) => {
                    warn!(%file_name, %error, "download failed");
                    format!("Could not download {file_name}: {error}")
                }
            });
        }

        FrameUpdate {
            previews: self.previews.drain(),
            open_urls: std::mem::take(&mut self.open_urls),
            next_wake,
        }
    }

    pub fn dispatch(&mut self, event: AppEvent, now: Instant) {
        match event {
            AppEvent::SelectCategory(index) => {
                self.state.status = None;
                if let PageState::Ready(gallery) = &mut self.state.page {
                    gallery.select(index, now);
                }
            }
            AppEvent::RequestPreview(path) => {
                self.previews.request(&path);
            }
            AppEvent::DownloadAsset(card) => {
                let transport = Arc::clone(&self.transport);
                let sender = self.download_sender.clone();
                let notify = Arc::clone(&self.notify);
                let url = join_url(&self.config.base_url, &card.download_path);
                let dir = self.config.download_dir.clone();
                let file_name = card.file_name;

                self.state.status = Some(format!("Downloading {file_name}..."));
                self.runtime.spawn(async move {
                    let result = download_asset(transport.as_ref(), &url, &dir, &file_name).await;
                    if sender.send((file_name, result)).is_ok() {
                        notify();
                    }
                });
            }
            AppEvent::ViewAsset(card) => {
                self.open_urls
                    .push(join_url(&self.config.base_url, &card.view_path));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::gallery::renderer::Selection;
    use crate::infra::http::testing::StubTransport;

    const MANIFEST: &str = r##"[
        {"pasta":"a","nome":"A","corIcone":"#fff","figurinhas":["x.png","y.png"]},
        {"pasta":"b","nome":"B","corIcone":"#000","figurinhas":["z.png"]}
    ]"##;

    fn config(download_dir: PathBuf) -> AppConfig {
        AppConfig {
            base_url: "http://host".to_string(),
            loading_delay: Duration::ZERO,
            download_dir,
            ..AppConfig::default()
        }
    }

    fn controller(transport: StubTransport, dir: &TempDir) -> ApplicationController<StubTransport> {
        ApplicationController::new(
            config(dir.path().to_path_buf()),
            Arc::new(transport),
            Handle::current(),
            || {},
        )
    }

    async fn settle<T: Transport>(
        controller: &mut ApplicationController<T>,
        done: impl Fn(&ApplicationController<T>) -> bool,
    ) -> FrameUpdate {
        let mut merged = FrameUpdate::default();
        for _ in 0..400 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let update = controller.poll(Instant::now());
            merged.previews.extend(update.previews);
            merged.open_urls.extend(update.open_urls);
            if done(controller) {
                break;
            }
        }
        merged
    }

    #[tokio::test]
    async fn bootstrap_loads_manifest_and_selects_first_category() {
        let dir = TempDir::new().expect("tempdir should be created");
        let mut controller = controller(
            StubTransport::default().with("http://host/js/figurinhas.json", 200, MANIFEST),
            &dir,
        );

        controller.bootstrap();
        assert!(matches!(controller.state().page, PageState::Loading));
        settle(&mut controller, |c| !matches!(c.state().page, PageState::Loading)).await;

        let gallery = controller.state().gallery().expect("gallery should be ready");
        assert_eq!(
            gallery.selection(),
            &Selection::CategorySelected {
                folder_key: "a".to_string()
            }
        );
        assert_eq!(gallery.grid().len(), 2);
    }

    #[tokio::test]
    async fn http_failure_shows_http_message() {
        let dir = TempDir::new().expect("tempdir should be created");
        let mut controller = controller(
            StubTransport::default().with("http://host/js/figurinhas.json", 500, ""),
            &dir,
        );

        controller.bootstrap();
        settle(&mut controller, |c| !matches!(c.state().page, PageState::Loading)).await;

        match &controller.state().page {
            PageState::Failed(message) => assert!(message.contains("HTTP error 500")),
            other => panic!("expected failure page, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_manifest_shows_empty_state() {
        let dir = TempDir::new().expect("tempdir should be created");
        let mut controller = controller(StubTransport::default(), &dir);

        controller.apply_manifest(Err(LoadError::EmptyManifest), Instant::now());

        match &controller.state().page {
            PageState::Empty(message) => assert!(message.contains("No sticker categories")),
            other => panic!("expected empty page, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn select_event_switches_category() {
        let dir = TempDir::new().expect("tempdir should be created");
        let mut controller = controller(StubTransport::default(), &dir);
        let manifest =
            crate::manifest::loader::parse_manifest(MANIFEST.as_bytes()).expect("manifest should parse");
        let now = Instant::now();
        controller.apply_manifest(Ok(manifest), now);

        controller.dispatch(AppEvent::SelectCategory(1), now);

        let gallery = controller.state().gallery().expect("gallery should be ready");
        let active: Vec<usize> = gallery
            .render_controls()
            .into_iter()
            .filter(|control| control.active)
            .map(|control| control.index)
            .collect();
        assert_eq!(active, vec![1]);
        assert_eq!(gallery.grid()[0].file_name, "z.png");
    }

    #[tokio::test]
    async fn view_event_yields_absolute_url() {
        let dir = TempDir::new().expect("tempdir should be created");
        let mut controller = controller(StubTransport::default(), &dir);
        let manifest =
            crate::manifest::loader::parse_manifest(MANIFEST.as_bytes()).expect("manifest should parse");
        let now = Instant::now();
        controller.apply_manifest(Ok(manifest), now);
        let card = controller.state().gallery().expect("gallery should be ready").grid()[0].clone();

        controller.dispatch(AppEvent::ViewAsset(card), now);
        let update = controller.poll(now);

        assert_eq!(update.open_urls, vec!["http://host/assets/a/x.png"]);
        assert!(controller.poll(now).open_urls.is_empty());
    }

    #[tokio::test]
    async fn download_event_saves_file_and_reports_status() {
        let dir = TempDir::new().expect("tempdir should be created");
        let mut controller = controller(
            StubTransport::default().with("http://host/assets/a/x.png", 200, "sticker"),
            &dir,
        );
        let manifest =
            crate::manifest::loader::parse_manifest(MANIFEST.as_bytes()).expect("manifest should parse");
        let now = Instant::now();
        controller.apply_manifest(Ok(manifest), now);
        let card = controller.state().gallery().expect("gallery should be ready").grid()[0].clone();

        controller.dispatch(AppEvent::DownloadAsset(card), now);
        settle(&mut controller, |c| {
            c.state()
                .status
                .as_deref()
                .is_some_and(|status| status.starts_with("Saved"))
        })
        .await;

        assert_eq!(
            std::fs::read(dir.path().join("x.png")).expect("download should exist"),
            b"sticker"
        );
    }

    #[tokio::test]
    async fn selecting_a_category_clears_the_download_status() {
        let dir = TempDir::new().expect("tempdir should be created");
        let mut controller = controller(
            StubTransport::default().with("http://host/assets/a/x.png", 200, "sticker"),
            &dir,
        );
        let manifest =
            crate::manifest::loader::parse_manifest(MANIFEST.as_bytes()).expect("manifest should parse");
        let now = Instant::now();
        controller.apply_manifest(Ok(manifest), now);
        let card = controller.state().gallery().expect("gallery should be ready").grid()[0].clone();

        controller.dispatch(AppEvent::DownloadAsset(card), now);
        settle(&mut controller, |c| {
            c.state()
                .status
                .as_deref()
                .is_some_and(|status| status.starts_with("Saved"))
        })
        .await;
        assert!(controller.state().status.is_some());

        controller.dispatch(AppEvent::SelectCategory(1), now);

        assert_eq!(controller.state().status, None);
    }
}
