//! Control panel: album picker, transport, legend, track info and lyrics.
//! The panel never mutates the controller; it returns intents.

use egui::{Color32, Key, RichText, Stroke};

use crate::controller::{StatusKind, StatusMessage, WheelController};
use crate::lyrics::Lyrics;
use crate::playback::BackendFactory;

const VOLUME_STEP: i32 = 5;
const ERROR_COLOR: Color32 = Color32::from_rgb(255, 100, 100);

#[derive(Clone, Debug, PartialEq)]
pub enum PanelIntent {
    RefreshAlbums,
    LoadAlbum(String),
    TogglePlay,
    Previous,
    Next,
    Stop,
    Seek(f64),
    SetVolume(i32),
    AdjustVolume(i32),
    SwitchStyle(String),
}

/// Network work the page has to start after an intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetch {
    AlbumList,
    Album(String),
}

/// Apply a transport or style intent; album intents come back as fetches.
pub fn dispatch<F: BackendFactory>(
    controller: &mut WheelController<F>,
    intent: PanelIntent,
) -> Option<Fetch> {
    // Errors are already on the status line.
    match intent {
        PanelIntent::RefreshAlbums => return Some(Fetch::AlbumList),
        PanelIntent::LoadAlbum(name) => return Some(Fetch::Album(name)),
        PanelIntent::TogglePlay => {
            let _ = controller.toggle_play_pause();
        }
        PanelIntent::Previous => {
            let _ = controller.previous();
        }
        PanelIntent::Next => {
            let _ = controller.next();
        }
        PanelIntent::Stop => controller.stop(),
        PanelIntent::Seek(seconds) => controller.seek(seconds),
        PanelIntent::SetVolume(percent) => {
            controller.set_volume_percent(percent);
        }
        PanelIntent::AdjustVolume(delta) => {
            controller.adjust_volume(delta);
        }
        PanelIntent::SwitchStyle(key) => {
            let _ = controller.choose_style(&key);
        }
    }
    None
}

/// Space toggles, left/right step tracks, up/down change the volume.
pub fn intent_for_key(key: Key) -> Option<PanelIntent> {
    match key {
        Key::Space => Some(PanelIntent::TogglePlay),
        Key::ArrowLeft => Some(PanelIntent::Previous),
        Key::ArrowRight => Some(PanelIntent::Next),
        Key::ArrowUp => Some(PanelIntent::AdjustVolume(VOLUME_STEP)),
        Key::ArrowDown => Some(PanelIntent::AdjustVolume(-VOLUME_STEP)),
        _ => None,
    }
}

/// Keyboard shortcuts pressed this frame, unless a text field has focus.
pub fn keyboard_intents(ctx: &egui::Context) -> Vec<PanelIntent> {
    if ctx.wants_keyboard_input() {
        return Vec::new();
    }
    ctx.input(|input| {
        input
            .events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    ..
                } => intent_for_key(*key),
                _ => None,
            })
            .collect()
    })
}

/// `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendChip {
    pub key: String,
    pub name: String,
    pub color: Color32,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    pub artist: String,
    pub icon: String,
    pub style_name: String,
}

/// Snapshot of everything the panel draws.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelView {
    pub album_name: Option<String>,
    pub album_artist: String,
    pub legend: Vec<LegendChip>,
    pub track: Option<TrackInfo>,
    pub playing: bool,
    pub current: f64,
    pub duration: f64,
    pub volume_percent: u8,
    pub lyrics_preview: String,
    pub lyrics_full: String,
    pub status: Option<StatusMessage>,
}

impl PanelView {
    pub fn from_controller<F: BackendFactory>(controller: &WheelController<F>) -> Self {
        let config = controller.config();
        let selection = controller.selection();
        let legend = controller
            .styles()
            .iter()
            .map(|style| LegendChip {
                key: style.key.clone(),
                name: style.display_name.clone(),
                color: style.color32(),
                active: selection.is_some_and(|s| s.style == style.key),
            })
            .collect();
        let track = controller.current_track().zip(selection).map(|(t, s)| TrackInfo {
            name: t.name.clone(),
            artist: t.artist.clone(),
            icon: t.icon.clone(),
            style_name: controller.styles().display_name(&s.style).to_string(),
        });
        let lyrics = controller.current_lyrics().unwrap_or(&Lyrics::Unavailable);
        let engine = controller.engine();
        Self {
            album_name: controller.album().map(|a| a.name.clone()),
            album_artist: controller.album().map(|a| a.artist.clone()).unwrap_or_default(),
            legend,
            track,
            playing: engine.wants_playback(),
            current: engine.current_time(),
            duration: engine.duration(),
            volume_percent: controller.volume_percent(),
            lyrics_preview: lyrics.preview(config.lyrics_preview_chars),
            lyrics_full: lyrics.full_text().to_string(),
            status: controller.status().cloned(),
        }
    }
}

#[derive(Default)]
pub struct ControlPanel {
    albums: Vec<String>,
    chosen_album: Option<String>,
    show_lyrics: bool,
    seek_drag: Option<f64>,
}

impl ControlPanel {
    pub fn set_albums(&mut self, albums: Vec<String>) {
        if self
            .chosen_album
            .as_ref()
            .is_some_and(|chosen| !albums.contains(chosen))
        {
            self.chosen_album = None;
        }
        if self.chosen_album.is_none() {
            self.chosen_album = albums.first().cloned();
        }
        self.albums = albums;
    }

    pub fn show(&mut self, ui: &mut egui::Ui, view: &PanelView) -> Vec<PanelIntent> {
        let mut intents = Vec::new();

        ui.heading("🎡 Music Wheel");
        ui.add_space(4.0);
        self.album_picker(ui, &mut intents);
        if let Some(name) = &view.album_name {
            ui.label(RichText::new(format!("{name} · {}", view.album_artist)).strong());
        }
        ui.separator();

        legend(ui, &view.legend, &mut intents);
        ui.separator();

        match &view.track {
            Some(track) => self.track_box(ui, view, track, &mut intents),
            None => {
                ui.colored_label(Color32::GRAY, "No track selected");
            }
        }

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("🔊");
            let mut percent = i32::from(view.volume_percent);
            let slider = egui::Slider::new(&mut percent, 0..=100).suffix("%");
            if ui.add(slider).changed() {
                intents.push(PanelIntent::SetVolume(percent));
            }
        });

        if let Some(status) = &view.status {
            ui.add_space(4.0);
            match status.kind {
                StatusKind::Error => ui.colored_label(ERROR_COLOR, format!("⚠ {}", status.text)),
                StatusKind::Info => ui.colored_label(Color32::LIGHT_GRAY, status.text.as_str()),
            };
        }

        let mut open = self.show_lyrics;
        egui::Window::new("Lyrics")
            .open(&mut open)
            .vscroll(true)
            .default_width(320.0)
            .show(ui.ctx(), |ui| {
                ui.label(view.lyrics_full.as_str());
            });
        self.show_lyrics = open;

        intents
    }

    fn album_picker(&mut self, ui: &mut egui::Ui, intents: &mut Vec<PanelIntent>) {
        ui.horizontal(|ui| {
            let selected = self.chosen_album.as_deref().unwrap_or("Choose an album");
            egui::ComboBox::from_id_salt("album_picker")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    for name in &self.albums {
                        ui.selectable_value(&mut self.chosen_album, Some(name.clone()), name);
                    }
                });
            if ui.button("Load").clicked() {
                if let Some(name) = &self.chosen_album {
                    intents.push(PanelIntent::LoadAlbum(name.clone()));
                }
            }
            if ui.button("⟳").on_hover_text("Refresh album list").clicked() {
                intents.push(PanelIntent::RefreshAlbums);
            }
        });
    }

    fn track_box(
        &mut self,
        ui: &mut egui::Ui,
        view: &PanelView,
        track: &TrackInfo,
        intents: &mut Vec<PanelIntent>,
    ) {
        ui.group(|ui| {
            ui.label(RichText::new(format!("{} {}", track.icon, track.name)).strong());
            ui.label(format!("Style: {}", track.style_name));
            ui.label(format!("Artist: {}", track.artist));

            ui.horizontal(|ui| {
                let mut time = self.seek_drag.unwrap_or(view.current);
                ui.label(format_time(time));
                let slider = egui::Slider::new(&mut time, 0.0..=view.duration.max(1.0))
                    .show_value(false)
                    .trailing_fill(true);
                let response = ui.add(slider);
                if response.dragged() {
                    self.seek_drag = Some(time);
                } else if response.drag_stopped() || response.changed() {
                    self.seek_drag = None;
                    intents.push(PanelIntent::Seek(time));
                } else {
                    self.seek_drag = None;
                }
                ui.label(format_time(view.duration));
            });

            ui.horizontal(|ui| {
                if ui.button("⏮").clicked() {
                    intents.push(PanelIntent::Previous);
                }
                let glyph = if view.playing { "⏸" } else { "▶" };
                if ui.button(glyph).clicked() {
                    intents.push(PanelIntent::TogglePlay);
                }
                if ui.button("⏭").clicked() {
                    intents.push(PanelIntent::Next);
                }
                if ui.button("⏹").clicked() {
                    intents.push(PanelIntent::Stop);
                }
            });

            let preview = egui::Label::new(RichText::new(&view.lyrics_preview).italics())
                .sense(egui::Sense::click());
            if ui
                .add(preview)
                .on_hover_text("Show full lyrics")
                .clicked()
            {
                self.show_lyrics = true;
            }
        });
    }
}

fn legend(ui: &mut egui::Ui, chips: &[LegendChip], intents: &mut Vec<PanelIntent>) {
    ui.horizontal_wrapped(|ui| {
        for chip in chips {
            let stroke = if chip.active {
                Stroke::new(2.0, Color32::WHITE)
            } else {
                Stroke::NONE
            };
            let button = egui::Button::new(RichText::new(&chip.name).color(Color32::WHITE))
                .fill(chip.color)
                .stroke(stroke);
            if ui.add(button).clicked() {
                intents.push(PanelIntent::SwitchStyle(chip.key.clone()));
            }
        }
    });
}
