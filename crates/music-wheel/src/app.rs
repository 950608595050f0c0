use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use egui::{CursorIcon, Sense, Vec2};
use web_time::Instant;

use crate::album::AlbumDocument;
use crate::api;
use crate::config::WheelConfig;
use crate::controller::{StatusMessage, WheelController, WheelEvent};
use crate::playback::web::WebBackendFactory;
use crate::ui::{self, ControlPanel, Fetch, PanelView};
use crate::Result;

/// Fetch completions, drained at the start of every frame.
#[derive(Default)]
struct Inbox {
    albums: Option<Result<Vec<String>>>,
    album: Option<(u64, Result<AlbumDocument>)>,
    lyrics: Vec<(u64, u32, String, Result<String>)>,
}

pub struct MusicWheelApp {
    controller: WheelController<WebBackendFactory>,
    panel: ControlPanel,
    inbox: Rc<RefCell<Inbox>>,
    // Only the newest album request is applied.
    album_request: u64,
    repaint_every: Duration,
}

impl MusicWheelApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: WheelConfig) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let mut app = Self {
            repaint_every: config.progress_interval(),
            controller: WheelController::new(WebBackendFactory, config),
            panel: ControlPanel::default(),
            inbox: Rc::new(RefCell::new(Inbox::default())),
            album_request: 0,
        };
        app.start_fetch(Fetch::AlbumList, &cc.egui_ctx);
        app
    }

    fn start_fetch(&mut self, fetch: Fetch, ctx: &egui::Context) {
        let inbox = self.inbox.clone();
        let ctx = ctx.clone();
        match fetch {
            Fetch::AlbumList => {
                let url = api::album_list_url(self.controller.config());
                wasm_bindgen_futures::spawn_local(async move {
                    let result = api::web::album_list(&url).await;
                    inbox.borrow_mut().albums = Some(result);
                    ctx.request_repaint();
                });
            }
            Fetch::Album(name) => {
                self.album_request += 1;
                let request = self.album_request;
                let url = api::album_load_url(self.controller.config(), &name);
                self.controller
                    .notify(StatusMessage::info(format!("Loading album {name}...")));
                wasm_bindgen_futures::spawn_local(async move {
                    let result = api::web::album_load(&url).await;
                    inbox.borrow_mut().album = Some((request, result));
                    ctx.request_repaint();
                });
            }
        }
    }

    fn fetch_lyrics(&self, album: u64, segment: u32, style: String, url: String, ctx: &egui::Context) {
        let inbox = self.inbox.clone();
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = api::web::fetch_ok(&url).await;
            inbox.borrow_mut().lyrics.push((album, segment, style, result));
            ctx.request_repaint();
        });
    }

    fn drain_inbox(&mut self) {
        let (albums, album, lyrics) = {
            let mut inbox = self.inbox.borrow_mut();
            (
                inbox.albums.take(),
                inbox.album.take(),
                std::mem::take(&mut inbox.lyrics),
            )
        };
        match albums {
            Some(Ok(names)) => self.panel.set_albums(names),
            Some(Err(err)) => {
                log::warn!("album list failed: {err}");
                self.controller
                    .notify(StatusMessage::error(format!("Failed to load albums: {err}")));
            }
            None => {}
        }
        if let Some((request, result)) = album {
            if request == self.album_request {
                self.controller.album_fetched(result);
            } else {
                log::debug!("dropping superseded album response #{request}");
            }
        }
        for (album, segment, style, result) in lyrics {
            self.controller.lyrics_loaded(album, segment, &style, result);
        }
    }
}

impl eframe::App for MusicWheelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.drain_inbox();
        self.controller.tick(now);
        for event in self.controller.drain_events() {
            if let WheelEvent::LyricsRequested {
                album,
                segment,
                style,
                url,
            } = event
            {
                self.fetch_lyrics(album, segment, style, url, ctx);
            }
        }

        let screen = ctx.screen_rect();
        self.controller.renderer_mut().observe_viewport(
            screen.width(),
            screen.height(),
            ctx.pixels_per_point(),
            now,
        );

        let mut intents = ui::keyboard_intents(ctx);
        let view = PanelView::from_controller(&self.controller);

        egui::SidePanel::right("control_panel")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    intents.extend(self.panel.show(ui, &view));
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let size = self.controller.renderer().layout().size;
            let (response, painter) = ui.allocate_painter(Vec2::splat(size), Sense::click());
            let origin = response.rect.min;

            match response.hover_pos() {
                Some(pos) => {
                    if self.controller.pointer_moved(pos.x - origin.x, pos.y - origin.y) {
                        ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
                    }
                }
                None => self.controller.pointer_left(),
            }
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    // Misses and unavailable points are already reported.
                    let _ = self
                        .controller
                        .pointer_clicked(pos.x - origin.x, pos.y - origin.y);
                }
            }

            self.controller.renderer_mut().paint(&painter, origin);
        });

        for intent in intents {
            if let Some(fetch) = ui::dispatch(&mut self.controller, intent) {
                self.start_fetch(fetch, ctx);
            }
        }

        ctx.request_repaint_after(self.repaint_every);
    }
}
