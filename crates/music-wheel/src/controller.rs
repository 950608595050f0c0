//! Keeps the selection, the wheel and the playback engine in step.
//!
//! The controller owns the album, the style configuration, the renderer and
//! the engine. Every user intent and every engine event goes through it, and
//! anything the page has to react to comes back out of
//! [`WheelController::drain_events`].

use std::rc::Rc;
use web_time::Instant;

use crate::album::{Album, AlbumDocument, Track};
use crate::config::WheelConfig;
use crate::lyrics::{Lyrics, LyricsCache};
use crate::playback::{
    BackendFactory, EngineEvent, MediaSource, PlaybackEngine, PlaybackState, Transport,
};
use crate::renderer::{HitPoint, WheelRenderer};
use crate::styles::{album_style_definitions, StyleConfig, StylePatch};
use crate::{Result, WheelError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WheelEvent {
    AlbumLoaded { name: String, tracks: usize, styles: usize },
    SelectionChanged(Option<HitPoint>),
    PlaybackStateChanged(PlaybackState),
    TimeUpdate { current: f64, duration: f64 },
    Ended,
    /// The page should fetch `url` and hand the text, with `album` echoed
    /// back, to [`WheelController::lyrics_loaded`].
    LyricsRequested {
        album: u64,
        segment: u32,
        style: String,
        url: String,
    },
    Status(StatusMessage),
}

pub struct WheelController<F: BackendFactory> {
    config: WheelConfig,
    album: Option<Rc<Album>>,
    // Bumped on every album load; lyrics replies for older albums are dropped.
    album_generation: u64,
    styles: Rc<StyleConfig>,
    selection: Option<HitPoint>,
    renderer: WheelRenderer,
    engine: PlaybackEngine<F>,
    lyrics: LyricsCache,
    status: Option<StatusMessage>,
    events: Vec<WheelEvent>,
}

impl<F: BackendFactory> WheelController<F> {
    pub fn new(factory: F, config: WheelConfig) -> Self {
        Self {
            album: None,
            album_generation: 0,
            styles: Rc::new(StyleConfig::empty(&config)),
            selection: None,
            renderer: WheelRenderer::new(&config),
            engine: PlaybackEngine::new(factory, &config),
            lyrics: LyricsCache::default(),
            status: None,
            events: Vec::new(),
            config,
        }
    }

    // ===== Accessors =====

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn album(&self) -> Option<&Album> {
        self.album.as_deref()
    }

    pub fn album_generation(&self) -> u64 {
        self.album_generation
    }

    pub fn styles(&self) -> &StyleConfig {
        &self.styles
    }

    pub fn selection(&self) -> Option<&HitPoint> {
        self.selection.as_ref()
    }

    pub fn current_track(&self) -> Option<&Track> {
        let selection = self.selection.as_ref()?;
        self.album.as_ref()?.track(selection.segment)
    }

    pub fn renderer(&self) -> &WheelRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut WheelRenderer {
        &mut self.renderer
    }

    pub fn engine(&self) -> &PlaybackEngine<F> {
        &self.engine
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Lyrics of the current selection, if any were requested.
    pub fn current_lyrics(&self) -> Option<&Lyrics> {
        let selection = self.selection.as_ref()?;
        self.lyrics.get(selection.segment, &selection.style)
    }

    pub fn volume_percent(&self) -> u8 {
        (self.engine.volume() * 100.0).round() as u8
    }

    pub fn drain_events(&mut self) -> Vec<WheelEvent> {
        std::mem::take(&mut self.events)
    }

    // ===== Album =====

    /// Replace album, styles and wheel wholesale; drops the selection and
    /// whatever was playing.
    pub fn load_album(&mut self, doc: &AlbumDocument) {
        let definitions = album_style_definitions(doc, &self.config);
        let styles = Rc::new(StyleConfig::from_definitions(&definitions, &self.config));
        let album = Rc::new(Album::from_document(doc));
        log::info!(
            "album '{}' loaded: {} tracks, {} styles",
            album.name,
            album.track_count(),
            styles.len()
        );

        self.engine.unload();
        self.album_generation += 1;
        self.lyrics.clear();
        self.renderer.configure(Some(album.clone()), styles.clone());
        self.set_selection(None);
        self.events.push(WheelEvent::AlbumLoaded {
            name: album.name.clone(),
            tracks: album.track_count(),
            styles: styles.len(),
        });
        self.notify(StatusMessage::info(format!(
            "Loaded {} ({} tracks)",
            album.name,
            album.track_count()
        )));
        self.album = Some(album);
        self.styles = styles;
    }

    /// Completion of an album fetch. A failure leaves the current album alone.
    pub fn album_fetched(&mut self, result: Result<AlbumDocument>) {
        match result {
            Ok(doc) => self.load_album(&doc),
            Err(err) => {
                log::warn!("album load failed: {err}");
                self.notify(StatusMessage::error(format!("Failed to load album: {err}")));
            }
        }
    }

    /// Change one style's look; wheel and style table move together.
    pub fn update_style(&mut self, key: &str, patch: StylePatch) -> bool {
        if !Rc::make_mut(&mut self.styles).patch(key, patch) {
            log::warn!("update_style: unknown style '{key}'");
            return false;
        }
        self.renderer.set_styles(self.styles.clone());
        true
    }

    // ===== Selection =====

    /// Play the audio at (`segment`, `style`). When there is none, the
    /// selection and the engine are left untouched.
    pub fn select_point(&mut self, segment: u32, style: &str) -> Result<()> {
        let result = self.try_select(segment, style);
        self.report(&result);
        result
    }

    fn try_select(&mut self, segment: u32, style: &str) -> Result<()> {
        let album = self.album.clone().ok_or(WheelError::NoAlbum)?;
        let track = album
            .track(segment)
            .ok_or(WheelError::UnknownSegment(segment))?;
        let audio = track.audio(style).ok_or_else(|| WheelError::Unavailable {
            segment,
            style: style.to_string(),
        })?;

        self.set_selection(Some(HitPoint::new(segment, style)));
        self.request_lyrics(segment, style, audio.lyrics_url.as_deref());
        self.engine
            .load(&MediaSource::from_audio(&audio.source, &self.config))?;
        self.engine.play();
        self.notify(StatusMessage::info(format!(
            "Loading {} ({})",
            track.name,
            self.styles.display_name(style)
        )));
        Ok(())
    }

    /// Same track, other style, same position and play/pause state.
    pub fn switch_style(&mut self, style: &str) -> Result<()> {
        let result = self.try_switch_style(style);
        self.report(&result);
        result
    }

    fn try_switch_style(&mut self, style: &str) -> Result<()> {
        let Some(current) = self.selection.clone() else {
            return Ok(());
        };
        if current.style == style {
            return Ok(());
        }
        let album = self.album.clone().ok_or(WheelError::NoAlbum)?;
        let audio = album
            .audio(current.segment, style)
            .ok_or_else(|| WheelError::Unavailable {
                segment: current.segment,
                style: style.to_string(),
            })?;

        let position = self.engine.current_time();
        let was_playing = self.engine.wants_playback();
        log::debug!(
            "switching {} -> {style} at {position:.2}s (playing: {was_playing})",
            current.style
        );

        self.set_selection(Some(HitPoint::new(current.segment, style)));
        self.request_lyrics(current.segment, style, audio.lyrics_url.as_deref());
        self.engine
            .load(&MediaSource::from_audio(&audio.source, &self.config))?;
        self.engine.seek(position);
        if was_playing {
            self.engine.play();
        }
        self.notify(StatusMessage::info(format!(
            "Style: {}",
            self.styles.display_name(style)
        )));
        Ok(())
    }

    /// A legend chip was clicked.
    pub fn choose_style(&mut self, style: &str) -> Result<()> {
        if self.selection.is_none() {
            let err = WheelError::NoSelection;
            self.report_error(&err);
            return Err(err);
        }
        self.switch_style(style)
    }

    /// Previous segment in numeric order, same style. No-op at the first.
    pub fn previous(&mut self) -> Result<()> {
        self.step(Album::previous_segment)
    }

    /// Next segment in numeric order, same style. No-op at the last.
    pub fn next(&mut self) -> Result<()> {
        self.step(Album::next_segment)
    }

    fn step(&mut self, neighbour: fn(&Album, u32) -> Option<u32>) -> Result<()> {
        let (Some(current), Some(album)) = (self.selection.clone(), self.album.clone()) else {
            return Ok(());
        };
        match neighbour(&album, current.segment) {
            Some(segment) => self.select_point(segment, &current.style),
            None => Ok(()),
        }
    }

    // ===== Transport =====

    pub fn toggle_play_pause(&mut self) -> Result<()> {
        let Some(current) = self.selection.clone() else {
            let err = WheelError::NoSelection;
            self.report_error(&err);
            return Err(err);
        };
        if self.engine.wants_playback() {
            self.engine.pause();
            return Ok(());
        }
        match self.engine.play() {
            Transport::Applied | Transport::Deferred => Ok(()),
            // The last load failed; pressing play again retries it.
            Transport::NothingLoaded => self.select_point(current.segment, &current.style),
        }
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn seek(&mut self, seconds: f64) {
        if self.engine.seek(seconds) == Transport::NothingLoaded {
            self.report_error(&WheelError::NothingLoaded);
        }
    }

    /// `percent` is clamped to 0..=100.
    pub fn set_volume_percent(&mut self, percent: i32) -> u8 {
        let volume = self.engine.set_volume(f64::from(percent.clamp(0, 100)) / 100.0);
        (volume * 100.0).round() as u8
    }

    pub fn adjust_volume(&mut self, delta_percent: i32) -> u8 {
        self.set_volume_percent(i32::from(self.volume_percent()) + delta_percent)
    }

    // ===== Pointer =====

    /// Returns `true` while a playable point is under the pointer.
    pub fn pointer_moved(&mut self, x: f32, y: f32) -> bool {
        self.renderer.pointer_moved(x, y).is_some()
    }

    pub fn pointer_left(&mut self) {
        self.renderer.pointer_left();
    }

    /// Clicks off any point are ignored.
    pub fn pointer_clicked(&mut self, x: f32, y: f32) -> Option<Result<()>> {
        let hit = self.renderer.hit_test(x, y)?;
        Some(self.select_point(hit.segment, &hit.style))
    }

    // ===== Lyrics =====

    fn request_lyrics(&mut self, segment: u32, style: &str, url: Option<&str>) {
        let Some(url) = url else {
            self.lyrics.mark_unavailable(segment, style);
            return;
        };
        if self.lyrics.begin(segment, style) {
            self.events.push(WheelEvent::LyricsRequested {
                album: self.album_generation,
                segment,
                style: style.to_string(),
                url: url.to_string(),
            });
        }
    }

    /// Completion of a lyrics fetch. Replies for an album that has since been
    /// replaced are ignored.
    pub fn lyrics_loaded(&mut self, album: u64, segment: u32, style: &str, result: Result<String>) {
        if album != self.album_generation {
            log::debug!("dropping lyrics for {segment}/{style} from album #{album}");
            return;
        }
        let text = match result {
            Ok(text) => Some(text),
            Err(err) => {
                log::warn!("lyrics for {segment}/{style} failed: {err}");
                None
            }
        };
        if !self.lyrics.finish(segment, style, text) {
            log::debug!("lyrics for {segment}/{style} were not pending");
        }
    }

    // ===== Frame =====

    /// Apply engine events and settled resizes. Call once per UI turn.
    pub fn tick(&mut self, now: Instant) {
        self.renderer.poll_resize(now);
        self.engine.pump(now);
        for event in self.engine.drain_events() {
            match event {
                EngineEvent::StateChanged(state) => {
                    self.events.push(WheelEvent::PlaybackStateChanged(state));
                }
                EngineEvent::Loaded { .. } => {
                    if let Some(track) = self.current_track() {
                        let text = format!("Now playing: {}", track.name);
                        self.notify(StatusMessage::info(text));
                    }
                }
                EngineEvent::LoadFailed { reason, .. } => {
                    self.notify(StatusMessage::error(format!("Playback error: {reason}")));
                }
                EngineEvent::TimeUpdate { current, duration } => {
                    self.events.push(WheelEvent::TimeUpdate { current, duration });
                }
                EngineEvent::PlayBlocked(_) => {
                    self.notify(StatusMessage::info("Press play to start playback"));
                }
                EngineEvent::Ended => {
                    self.events.push(WheelEvent::Ended);
                    // Failures were already reported through the status line.
                    let _ = self.next();
                }
            }
        }
    }

    // ===== Internals =====

    fn set_selection(&mut self, selection: Option<HitPoint>) {
        if self.selection != selection {
            self.renderer.set_selection(selection.clone());
            self.events.push(WheelEvent::SelectionChanged(selection.clone()));
            self.selection = selection;
        }
    }

    /// Put a message on the status line.
    pub fn notify(&mut self, status: StatusMessage) {
        self.events.push(WheelEvent::Status(status.clone()));
        self.status = Some(status);
    }

    fn report(&mut self, result: &Result<()>) {
        if let Err(err) = result {
            self.report_error(err);
        }
    }

    fn report_error(&mut self, err: &WheelError) {
        let status = match err {
            WheelError::NoSelection | WheelError::NothingLoaded => {
                StatusMessage::info("Select a track first")
            }
            WheelError::Unavailable { style, .. } => StatusMessage::info(format!(
                "No audio for {} on this track",
                self.styles.display_name(style)
            )),
            other => StatusMessage::error(other.to_string()),
        };
        log::warn!("{err}");
        self.notify(status);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::album::{StyleAudioDocument, StyleDefinition, TrackDocument};
    use crate::playback::mock::{MockFactory, MockRegistry};
    use crate::playback::BackendKind;

    fn controller() -> (WheelController<MockFactory>, MockRegistry) {
        let registry = MockRegistry::default();
        let c = WheelController::new(MockFactory::new(&registry), WheelConfig::default());
        (c, registry)
    }

    fn file(url: &str) -> StyleAudioDocument {
        StyleAudioDocument {
            url: Some(url.into()),
            audio_type: Some("file".into()),
            ..Default::default()
        }
    }

    fn video(id: &str) -> StyleAudioDocument {
        StyleAudioDocument {
            youtube_id: Some(id.into()),
            audio_type: Some("youtube".into()),
            ..Default::default()
        }
    }

    fn track(styles: Vec<(&str, StyleAudioDocument)>) -> TrackDocument {
        TrackDocument {
            styles: styles.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            ..Default::default()
        }
    }

    /// Three tracks; track 1 has rock only, track 2 has jazz only, track 3 both.
    fn sparse_album() -> AlbumDocument {
        let mut doc = AlbumDocument {
            album_name: "Sparse".into(),
            styles: Some(vec![
                StyleDefinition {
                    key: Some("rock".into()),
                    name: "Rock".into(),
                    color: "#d13b3b".into(),
                },
                StyleDefinition {
                    key: Some("jazz".into()),
                    name: "Jazz".into(),
                    color: "#2373a1".into(),
                },
            ]),
            ..Default::default()
        };
        doc.tracks.insert("1".into(), track(vec![("rock", file("a.mp3"))]));
        doc.tracks.insert("2".into(), track(vec![("jazz", file("b.mp3"))]));
        doc.tracks.insert(
            "3".into(),
            track(vec![("rock", file("c.mp3")), ("jazz", video("vid3"))]),
        );
        doc
    }

    /// Every track has a file style and a video style.
    fn mixed_album(tracks: u32) -> AlbumDocument {
        let mut doc = AlbumDocument::default();
        for n in 1..=tracks {
            let mut lyrics = file(&format!("{n}.mp3"));
            lyrics.lyrics_url = Some(format!("/lyrics/{n}.txt"));
            doc.tracks.insert(
                n.to_string(),
                track(vec![("acoustic", lyrics), ("live", video(&format!("v{n}")))]),
            );
        }
        doc
    }

    fn settle(c: &mut WheelController<MockFactory>, reg: &MockRegistry, duration: f64) {
        reg.resolve(duration);
        c.tick(Instant::now());
    }

    #[test]
    fn end_to_end_selection_and_navigation() {
        let (mut c, reg) = controller();
        c.load_album(&sparse_album());
        c.drain_events();

        let err = c.select_point(1, "jazz").unwrap_err();
        assert!(matches!(err, WheelError::Unavailable { segment: 1, .. }));
        assert!(c.selection().is_none());
        assert_eq!(c.engine().state(), PlaybackState::Idle);

        c.select_point(1, "rock").unwrap();
        assert_eq!(c.selection(), Some(&HitPoint::new(1, "rock")));
        assert_eq!(c.engine().state(), PlaybackState::Loading);
        settle(&mut c, &reg, 60.0);
        let states: Vec<_> = c
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                WheelEvent::PlaybackStateChanged(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            [PlaybackState::Loading, PlaybackState::Ready, PlaybackState::Playing]
        );

        assert!(c.next().is_err());
        assert_eq!(c.selection(), Some(&HitPoint::new(1, "rock")));
        assert_eq!(c.engine().state(), PlaybackState::Playing);
        assert_eq!(
            reg.active().unwrap().source,
            Some(MediaSource::Direct { url: "a.mp3".into() })
        );
    }

    #[test]
    fn selecting_without_album_or_track_reports() {
        let (mut c, _reg) = controller();
        assert!(matches!(c.select_point(1, "rock"), Err(WheelError::NoAlbum)));
        c.load_album(&sparse_album());
        assert!(matches!(
            c.select_point(9, "rock"),
            Err(WheelError::UnknownSegment(9))
        ));
        assert!(c.selection().is_none());
        assert_eq!(c.status().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn toggle_without_selection_asks_for_a_track() {
        let (mut c, _reg) = controller();
        assert!(matches!(c.toggle_play_pause(), Err(WheelError::NoSelection)));
        assert_eq!(c.status().unwrap().text, "Select a track first");
        assert!(c.choose_style("rock").is_err());
    }

    #[test]
    fn switch_style_keeps_position_and_playing() {
        let (mut c, reg) = controller();
        c.load_album(&sparse_album());
        c.select_point(3, "rock").unwrap();
        settle(&mut c, &reg, 200.0);
        reg.advance(42.0);

        c.switch_style("jazz").unwrap();
        assert_eq!(c.selection(), Some(&HitPoint::new(3, "jazz")));
        assert_eq!(c.engine().active_kind(), Some(BackendKind::EmbeddedVideo));
        settle(&mut c, &reg, 200.0);

        let active = reg.active().unwrap();
        assert!((active.time - 42.0).abs() < 0.1);
        assert!(active.playing);
        assert_eq!(reg.playing_count(), 1);
    }

    #[test]
    fn switch_style_keeps_paused_state() {
        let (mut c, reg) = controller();
        c.load_album(&sparse_album());
        c.select_point(3, "rock").unwrap();
        settle(&mut c, &reg, 200.0);
        reg.advance(10.0);
        c.toggle_play_pause().unwrap();
        assert_eq!(c.engine().state(), PlaybackState::Ready);

        c.switch_style("jazz").unwrap();
        settle(&mut c, &reg, 200.0);
        let active = reg.active().unwrap();
        assert_eq!(active.time, 10.0);
        assert!(!active.playing);
        assert_eq!(c.engine().state(), PlaybackState::Ready);
    }

    #[test]
    fn switch_style_before_the_first_load_settles() {
        let (mut c, reg) = controller();
        c.load_album(&sparse_album());
        c.select_point(3, "rock").unwrap();
        c.switch_style("jazz").unwrap();
        settle(&mut c, &reg, 100.0);
        assert_eq!(c.engine().state(), PlaybackState::Playing);
        assert_eq!(reg.playing_count(), 1);
        assert_eq!(
            reg.active().unwrap().source,
            Some(MediaSource::Embedded { video_id: "vid3".into() })
        );
    }

    #[test]
    fn switch_style_edge_cases() {
        let (mut c, reg) = controller();
        c.load_album(&sparse_album());
        c.switch_style("jazz").unwrap();
        assert!(c.selection().is_none());

        c.select_point(1, "rock").unwrap();
        settle(&mut c, &reg, 10.0);
        let loads = reg.active().unwrap().loads;
        c.switch_style("rock").unwrap();
        assert_eq!(reg.active().unwrap().loads, loads);

        assert!(matches!(
            c.switch_style("jazz"),
            Err(WheelError::Unavailable { .. })
        ));
        assert_eq!(c.selection(), Some(&HitPoint::new(1, "rock")));
        assert!(c.status().unwrap().text.contains("Jazz"));
    }

    #[test]
    fn stale_selection_never_starts() {
        let (mut c, reg) = controller();
        c.load_album(&mixed_album(4));
        c.select_point(1, "live").unwrap();
        let first = c.engine().token();
        c.select_point(2, "acoustic").unwrap();

        reg.active_sink()
            .unwrap()
            .emit(first, crate::playback::BackendEvent::Ready { duration: 5.0 });
        c.tick(Instant::now());
        assert_eq!(c.engine().state(), PlaybackState::Loading);
        assert_eq!(reg.playing_count(), 0);

        settle(&mut c, &reg, 30.0);
        assert_eq!(c.selection(), Some(&HitPoint::new(2, "acoustic")));
        assert_eq!(
            reg.active().unwrap().source,
            Some(MediaSource::Direct { url: "2.mp3".into() })
        );
    }

    #[test]
    fn random_mixed_sequences_play_at_most_one_backend() {
        let (mut c, reg) = controller();
        c.load_album(&mixed_album(6));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let style = if rng.random_bool(0.5) { "acoustic" } else { "live" };
            match rng.random_range(0..5) {
                0 | 1 => {
                    let _ = c.select_point(rng.random_range(1..=6), style);
                }
                2 => {
                    let _ = c.switch_style(style);
                }
                3 => {
                    let _ = c.toggle_play_pause();
                }
                _ => reg.resolve(120.0),
            }
            c.tick(Instant::now());
            assert!(reg.playing_count() <= 1);
            assert!(reg.live_count() <= 1);
        }
    }

    #[test]
    fn ended_advances_with_the_same_style() {
        let (mut c, reg) = controller();
        c.load_album(&mixed_album(2));
        c.select_point(1, "acoustic").unwrap();
        settle(&mut c, &reg, 30.0);
        reg.finish();
        c.tick(Instant::now());
        assert_eq!(c.selection(), Some(&HitPoint::new(2, "acoustic")));
        assert_eq!(c.engine().state(), PlaybackState::Loading);

        settle(&mut c, &reg, 30.0);
        reg.finish();
        c.tick(Instant::now());
        assert_eq!(c.selection(), Some(&HitPoint::new(2, "acoustic")));
        assert_eq!(c.engine().state(), PlaybackState::Ended);
    }

    #[test]
    fn previous_is_a_no_op_at_the_first_segment() {
        let (mut c, reg) = controller();
        c.load_album(&mixed_album(3));
        c.select_point(1, "live").unwrap();
        let loads = reg.backends().len();
        c.previous().unwrap();
        assert_eq!(c.selection(), Some(&HitPoint::new(1, "live")));
        assert_eq!(reg.backends().len(), loads);
        c.next().unwrap();
        c.previous().unwrap();
        assert_eq!(c.selection(), Some(&HitPoint::new(1, "live")));
    }

    #[test]
    fn volume_percent_clamps_and_steps() {
        let (mut c, reg) = controller();
        assert_eq!(c.volume_percent(), 70);
        assert_eq!(c.adjust_volume(5), 75);
        assert_eq!(c.set_volume_percent(150), 100);
        assert_eq!(c.adjust_volume(5), 100);
        assert_eq!(c.set_volume_percent(-5), 0);
        c.set_volume_percent(40);
        c.load_album(&mixed_album(1));
        c.select_point(1, "live").unwrap();
        assert_eq!(reg.active().unwrap().volume, 0.4);
    }

    #[test]
    fn failed_load_is_reported_and_play_retries() {
        let (mut c, reg) = controller();
        c.load_album(&mixed_album(1));
        c.select_point(1, "acoustic").unwrap();
        reg.fail("media could not be decoded");
        c.tick(Instant::now());
        assert_eq!(c.engine().state(), PlaybackState::Error);
        let status = c.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.text.contains("decoded"));

        c.toggle_play_pause().unwrap();
        assert_eq!(c.engine().state(), PlaybackState::Loading);
        assert_eq!(reg.active().unwrap().loads, 2);
    }

    #[test]
    fn album_reload_resets_everything() {
        let (mut c, reg) = controller();
        c.load_album(&mixed_album(2));
        c.select_point(1, "acoustic").unwrap();
        settle(&mut c, &reg, 30.0);
        c.load_album(&sparse_album());
        assert!(c.selection().is_none());
        assert!(c.renderer().selection().is_none());
        assert_eq!(c.engine().state(), PlaybackState::Idle);
        assert_eq!(reg.live_count(), 0);
        assert_eq!(c.styles().first_key(), Some("rock"));
        assert_eq!(c.renderer().num_tracks(), 3);
    }

    #[test]
    fn failed_album_fetch_keeps_the_old_album() {
        let (mut c, _reg) = controller();
        c.load_album(&sparse_album());
        c.album_fetched(Err(WheelError::Api("Album not found".into())));
        assert_eq!(c.album().unwrap().name, "Sparse");
        assert_eq!(c.status().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn lyrics_are_requested_once_per_pair() {
        let (mut c, reg) = controller();
        c.load_album(&mixed_album(2));
        c.drain_events();
        c.select_point(1, "acoustic").unwrap();
        let requested: Vec<_> = c
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, WheelEvent::LyricsRequested { .. }))
            .collect();
        assert_eq!(
            requested,
            vec![WheelEvent::LyricsRequested {
                album: c.album_generation(),
                segment: 1,
                style: "acoustic".into(),
                url: "/lyrics/1.txt".into()
            }]
        );
        assert_eq!(c.current_lyrics(), Some(&Lyrics::Loading));

        c.lyrics_loaded(c.album_generation(), 1, "acoustic", Ok("words".into()));
        settle(&mut c, &reg, 10.0);
        c.switch_style("live").unwrap();
        assert_eq!(c.current_lyrics(), Some(&Lyrics::Unavailable));
        c.switch_style("acoustic").unwrap();
        assert!(!c
            .drain_events()
            .iter()
            .any(|e| matches!(e, WheelEvent::LyricsRequested { .. })));
        assert_eq!(c.current_lyrics(), Some(&Lyrics::Loaded("words".into())));

        c.select_point(2, "acoustic").unwrap();
        let album = c.album_generation();
        c.lyrics_loaded(album, 2, "acoustic", Err(WheelError::Network("HTTP 404".into())));
        assert_eq!(c.current_lyrics(), Some(&Lyrics::Failed));
    }

    #[test]
    fn lyrics_from_a_replaced_album_are_dropped() {
        let (mut c, _reg) = controller();
        let mut first = sparse_album();
        if let Some(track) = first.tracks.get_mut("1") {
            if let Some(rock) = track.styles.get_mut("rock") {
                rock.lyrics_url = Some("/lyrics/first.txt".into());
            }
        }
        c.load_album(&first);
        c.select_point(1, "rock").unwrap();
        let old_album = c.album_generation();
        assert_eq!(c.current_lyrics(), Some(&Lyrics::Loading));

        c.load_album(&sparse_album());
        c.select_point(1, "rock").unwrap();
        assert_ne!(c.album_generation(), old_album);
        assert_eq!(c.current_lyrics(), Some(&Lyrics::Unavailable));

        c.lyrics_loaded(old_album, 1, "rock", Ok("old words".into()));
        assert_eq!(c.current_lyrics(), Some(&Lyrics::Unavailable));
        let album = c.album_generation();
        c.lyrics_loaded(album, 1, "rock", Ok("stray words".into()));
        assert_eq!(c.current_lyrics(), Some(&Lyrics::Unavailable));
    }

    #[test]
    fn style_edits_reach_the_wheel() {
        let (mut c, _reg) = controller();
        c.load_album(&sparse_album());
        assert!(c.update_style(
            "jazz",
            StylePatch {
                render_radius: Some(120.0),
                ..Default::default()
            }
        ));
        assert_eq!(c.styles().radius("jazz", false), 120.0);
        assert_eq!(c.renderer().radius("jazz"), 120.0);
        let pos = c.renderer().point_position(2, "jazz").unwrap();
        assert_eq!(
            c.renderer().hit_test(pos.x, pos.y),
            Some(HitPoint::new(2, "jazz"))
        );
        assert!(!c.update_style("polka", StylePatch::default()));
    }

    #[test]
    fn clicks_select_and_misses_are_ignored() {
        let (mut c, _reg) = controller();
        c.load_album(&sparse_album());
        let pos = c.renderer().point_position(3, "jazz").unwrap();
        assert!(c.pointer_moved(pos.x + 2.0, pos.y));
        assert!(c.pointer_clicked(pos.x, pos.y).unwrap().is_ok());
        assert_eq!(c.selection(), Some(&HitPoint::new(3, "jazz")));
        let center = c.renderer().layout().center();
        assert!(c.pointer_clicked(center.x, center.y).is_none());
        assert!(!c.pointer_moved(center.x, center.y));
    }

    #[test]
    fn progress_flows_through_for_embedded_playback() {
        let (mut c, reg) = controller();
        c.load_album(&mixed_album(1));
        c.select_point(1, "live").unwrap();
        reg.resolve(50.0);
        let t0 = Instant::now();
        c.tick(t0);
        c.drain_events();
        reg.advance(1.0);
        c.tick(t0 + Duration::from_millis(150));
        assert!(c.drain_events().contains(&WheelEvent::TimeUpdate {
            current: 1.0,
            duration: 50.0
        }));
    }
}
