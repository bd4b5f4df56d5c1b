use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use eframe::egui;
use eframe::egui::load::SizedTexture;
use tokio::runtime::Handle;

use crate::app::controller::ApplicationController;
use crate::app::events::AppEvent;
use crate::app::state::PageState;
use crate::gallery::color::parse_css_color;
use crate::gallery::renderer::{AssetCard, CategoryControl, Selection};
use crate::infra::config::AppConfig;
use crate::infra::http::Transport;

const CARD_WIDTH: f32 = 168.0;
const PREVIEW_SIZE: f32 = 148.0;
const FALLBACK_ICON_COLOR: egui::Color32 = egui::Color32::from_rgb(240, 196, 25);

pub struct GalleryApp<T> {
    controller: ApplicationController<T>,
    textures: HashMap<String, egui::TextureHandle>,
    failed_previews: HashSet<String>,
}

impl<T: Transport> GalleryApp<T> {
    fn new(controller: ApplicationController<T>) -> Self {
        Self {
            controller,
            textures: HashMap::new(),
            failed_previews: HashSet::new(),
        }
    }
}

impl<T: Transport> eframe::App for GalleryApp<T> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let update = self.controller.poll(now);

        for (path, result) in update.previews {
            match result {
                Ok(preview) => {
                    let image = egui::ColorImage::from_rgba_unmultiplied(
                        [preview.width as usize, preview.height as usize],
                        &preview.rgba,
                    );
                    let texture = ctx.load_texture(&path, image, egui::TextureOptions::LINEAR);
                    self.textures.insert(path, texture);
                }
                Err(_) => {
                    self.failed_previews.insert(path);
                }
            }
        }
        for url in update.open_urls {
            ctx.open_url(egui::OpenUrl::new_tab(url));
        }
        if let Some(wait) = update.next_wake {
            ctx.request_repaint_after(wait);
        }

        let mut events = Vec::new();
        let state = self.controller.state();

        egui::TopBottomPanel::top("categories").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading("Figurinhas");
            if let Some(gallery) = state.gallery() {
                ui.horizontal_wrapped(|ui| {
                    for control in gallery.render_controls() {
                        draw_control(ui, &control, &mut events);
                    }
                });
            }
            ui.add_space(6.0);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let text = match (&state.status, state.gallery()) {
                (Some(status), _) => status.clone(),
                (None, Some(gallery)) => match gallery.selection() {
                    Selection::CategorySelected { folder_key } => format!(
                        "{folder_key}: {} stickers shown ({} categories)",
                        gallery.grid().len(),
                        gallery.manifest().len()
                    ),
                    Selection::NoSelection => String::new(),
                },
                (None, None) => String::new(),
            };
            ui.label(text);
        });

        egui::CentralPanel::default().show(ctx, |ui| match &state.page {
            PageState::Loading => {
                ui.centered_and_justified(|ui| ui.spinner());
            }
            PageState::Empty(message) | PageState::Failed(message) => {
                ui.centered_and_justified(|ui| ui.label(message));
            }
            PageState::Ready(gallery) if gallery.is_empty() => {
                ui.centered_and_justified(|ui| ui.label("No sticker categories were found."));
            }
            PageState::Ready(gallery) if gallery.is_loading() => {
                ui.centered_and_justified(|ui| {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading stickers...");
                    });
                });
            }
            PageState::Ready(gallery) if gallery.last_resolution_error().is_some() => {
                if let Some(error) = gallery.last_resolution_error() {
                    ui.centered_and_justified(|ui| {
                        ui.label(format!("This category could not be shown: {error}"))
                    });
                }
            }
            PageState::Ready(gallery) => {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        for card in gallery.grid() {
                            let preview = PreviewSlot {
                                texture: self.textures.get(&card.preview_path),
                                failed: self.failed_previews.contains(&card.preview_path),
                                pending: self.controller.is_preview_pending(&card.preview_path),
                            };
                            draw_card(ui, card, preview, &mut events);
                        }
                    });
                });
            }
        });

        for event in events {
            self.controller.dispatch(event, now);
        }
    }
}

struct PreviewSlot<'a> {
    texture: Option<&'a egui::TextureHandle>,
    failed: bool,
    pending: bool,
}

fn icon_color(control: &CategoryControl) -> egui::Color32 {
    parse_css_color(&control.icon_color)
        .map(|[r, g, b, a]| egui::Color32::from_rgba_unmultiplied(r, g, b, a))
        .unwrap_or(FALLBACK_ICON_COLOR)
}

fn draw_control(ui: &mut egui::Ui, control: &CategoryControl, events: &mut Vec<AppEvent>) {
    ui.horizontal(|ui| {
        ui.colored_label(icon_color(control), "📁");
        if ui.selectable_label(control.active, &control.label).clicked() {
            events.push(AppEvent::SelectCategory(control.index));
        }
    });
}

fn draw_card(ui: &mut egui::Ui, card: &AssetCard, preview: PreviewSlot<'_>, events: &mut Vec<AppEvent>) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(CARD_WIDTH);
        ui.vertical_centered(|ui| {
            let (rect, response) =
                ui.allocate_exact_size(egui::vec2(PREVIEW_SIZE, PREVIEW_SIZE), egui::Sense::hover());

            match preview.texture {
                Some(texture) => {
                    let size = texture.size_vec2();
                    let scale = (rect.width() / size.x).min(rect.height() / size.y);
                    let fitted = egui::Rect::from_center_size(rect.center(), size * scale);
                    egui::Image::from_texture(SizedTexture::from_handle(texture)).paint_at(ui, fitted);
                }
                None => {
                    ui.painter()
                        .rect_filled(rect, 4.0, ui.visuals().faint_bg_color);
                    if preview.failed {
                        ui.painter().text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            "no preview",
                            egui::FontId::proportional(12.0),
                            ui.visuals().weak_text_color(),
                        );
                    } else if !preview.pending && ui.is_rect_visible(rect) {
                        events.push(AppEvent::RequestPreview(card.preview_path.clone()));
                    }
                }
            }
            response.on_hover_text(&card.file_name);

            ui.add(egui::Label::new(egui::RichText::new(&card.file_name).small()).truncate());
            ui.horizontal(|ui| {
                if ui.button("⬇ Download").clicked() {
                    events.push(AppEvent::DownloadAsset(card.clone()));
                }
                if ui.button("👁 View").clicked() {
                    events.push(AppEvent::ViewAsset(card.clone()));
                }
            });
        });
    });
}

pub fn launch_gallery_window<T: Transport>(
    config: AppConfig,
    transport: Arc<T>,
    runtime: Handle,
) -> Result<(), String> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([960.0, 680.0]),
        ..Default::default()
    };

    eframe::run_native(
        "figurinhas",
        options,
        Box::new(move |cc| {
            let repaint = cc.egui_ctx.clone();
            let mut controller =
                ApplicationController::new(config, transport, runtime, move || repaint.request_repaint());
            controller.bootstrap();
            Ok(Box::new(GalleryApp::new(controller)))
        }),
    )
    .map_err(|error| format!("failed to start UI: {error}"))
}
