//! One playback facade over two mutually exclusive backends.
//!
//! The engine owns the active backend: it creates one on first use, reuses it
//! while the backend kind stays the same and disposes it when a load needs the
//! other kind, so at most one backend can ever be audible. Backends report
//! through an [`EventSink`]; [`PlaybackEngine::pump`] drains it on the UI turn,
//! drops events from superseded loads and runs the progress timer.

mod backend;
#[cfg(test)]
pub(crate) mod mock;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use backend::{
    embedded_error, BackendEvent, BackendFactory, BackendKind, EmbeddedPlayerState, EventSink,
    LoadToken, MediaBackend, MediaSource,
};

use std::time::Duration;
use web_time::Instant;

use crate::config::WheelConfig;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Ended,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    StateChanged(PlaybackState),
    Loaded { token: LoadToken, duration: f64 },
    LoadFailed { token: LoadToken, reason: String },
    TimeUpdate { current: f64, duration: f64 },
    Ended,
    /// `play()` was refused; a later user-initiated play may succeed.
    PlayBlocked(String),
}

/// What happened to a transport request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Applied,
    /// Remembered until the pending load is ready.
    Deferred,
    /// Nothing is loaded; the caller should ask the user to pick a track.
    NothingLoaded,
}

#[derive(Clone, Debug)]
struct ProgressTimer {
    interval: Duration,
    armed: bool,
    last: Option<Instant>,
}

impl ProgressTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            armed: false,
            last: None,
        }
    }

    fn start(&mut self) {
        if !self.armed {
            self.armed = true;
            self.last = None;
        }
    }

    fn stop(&mut self) {
        self.armed = false;
        self.last = None;
    }

    fn due(&mut self, now: Instant) -> bool {
        if !self.armed {
            return false;
        }
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

pub struct PlaybackEngine<F: BackendFactory> {
    factory: F,
    sink: EventSink,
    backend: Option<Box<dyn MediaBackend>>,
    state: PlaybackState,
    token: LoadToken,
    volume: f64,
    current_time: f64,
    duration: f64,
    pending_seek: Option<f64>,
    play_when_ready: bool,
    timer: ProgressTimer,
    events: Vec<EngineEvent>,
}

impl<F: BackendFactory> PlaybackEngine<F> {
    pub fn new(factory: F, config: &WheelConfig) -> Self {
        Self {
            factory,
            sink: EventSink::default(),
            backend: None,
            state: PlaybackState::Idle,
            token: 0,
            volume: clamp_volume(config.default_volume),
            current_time: 0.0,
            duration: 0.0,
            pending_seek: None,
            play_when_ready: false,
            timer: ProgressTimer::new(config.progress_interval()),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Token of the only load whose results are honored.
    pub fn token(&self) -> LoadToken {
        self.token
    }

    pub fn active_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Playing, or about to play once the pending load is ready.
    pub fn wants_playback(&self) -> bool {
        self.is_playing() || (self.state == PlaybackState::Loading && self.play_when_ready)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(
            self.state,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Ended
        )
    }

    /// Position in seconds. While loading this is the seek target queued for
    /// the pending load.
    pub fn current_time(&self) -> f64 {
        match (&self.backend, self.state) {
            (_, PlaybackState::Loading) => self.pending_seek.unwrap_or(0.0),
            (Some(b), PlaybackState::Ready | PlaybackState::Playing) => b.current_time(),
            _ => self.current_time,
        }
    }

    pub fn duration(&self) -> f64 {
        match &self.backend {
            Some(b) if self.is_loaded() && b.duration() > 0.0 => b.duration(),
            _ => self.duration,
        }
    }

    /// Start loading `source`, superseding any load still in flight.
    pub fn load(&mut self, source: &MediaSource) -> Result<LoadToken> {
        self.token += 1;
        let token = self.token;
        let kind = source.kind();
        self.timer.stop();

        let replace = self.backend.as_ref().is_some_and(|b| b.kind() != kind);
        if replace {
            if let Some(mut old) = self.backend.take() {
                log::debug!("disposing {:?} backend for a {:?} load", old.kind(), kind);
                old.dispose();
            }
        } else if let Some(active) = self.backend.as_mut() {
            active.pause();
        }

        if self.backend.is_none() {
            match self.factory.create(kind, self.sink.clone()) {
                Ok(mut created) => {
                    created.set_volume(self.volume);
                    self.backend = Some(created);
                }
                Err(err) => {
                    log::warn!("could not create {kind:?} backend: {err}");
                    self.set_state(PlaybackState::Error);
                    self.events.push(EngineEvent::LoadFailed {
                        token,
                        reason: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }

        self.pending_seek = None;
        self.play_when_ready = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.set_state(PlaybackState::Loading);
        if let Some(active) = self.backend.as_mut() {
            log::debug!("load #{token}: {source:?}");
            active.load(source, token);
        }
        Ok(token)
    }

    pub fn play(&mut self) -> Transport {
        match self.state {
            PlaybackState::Idle | PlaybackState::Error => Transport::NothingLoaded,
            PlaybackState::Loading => {
                self.play_when_ready = true;
                Transport::Deferred
            }
            PlaybackState::Playing => Transport::Applied,
            PlaybackState::Ended => {
                self.seek_backend(0.0);
                self.start_backend();
                Transport::Applied
            }
            PlaybackState::Ready => {
                self.start_backend();
                Transport::Applied
            }
        }
    }

    pub fn pause(&mut self) -> Transport {
        match self.state {
            PlaybackState::Idle | PlaybackState::Error => Transport::NothingLoaded,
            PlaybackState::Loading => {
                self.play_when_ready = false;
                Transport::Deferred
            }
            PlaybackState::Playing => {
                self.timer.stop();
                if let Some(active) = self.backend.as_mut() {
                    active.pause();
                    self.current_time = active.current_time();
                }
                self.set_state(PlaybackState::Ready);
                Transport::Applied
            }
            PlaybackState::Ready | PlaybackState::Ended => Transport::Applied,
        }
    }

    /// Pause and rewind.
    pub fn stop(&mut self) -> Transport {
        let outcome = self.pause();
        self.seek(0.0);
        outcome
    }

    /// Clamped to `[0, duration]`. While loading the target is applied once
    /// the load is ready.
    pub fn seek(&mut self, seconds: f64) -> Transport {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        match self.state {
            PlaybackState::Idle | PlaybackState::Error => Transport::NothingLoaded,
            PlaybackState::Loading => {
                self.pending_seek = Some(seconds);
                Transport::Deferred
            }
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Ended => {
                let target = self.clamp_to_duration(seconds);
                self.seek_backend(target);
                if self.state == PlaybackState::Ended {
                    self.set_state(PlaybackState::Ready);
                }
                self.events.push(EngineEvent::TimeUpdate {
                    current: target,
                    duration: self.duration(),
                });
                Transport::Applied
            }
        }
    }

    /// Clamped to `[0, 1]` and remembered for backends created later.
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.volume = clamp_volume(volume);
        if let Some(active) = self.backend.as_mut() {
            active.set_volume(self.volume);
        }
        self.volume
    }

    /// Drop the active backend and forget any pending load.
    pub fn unload(&mut self) {
        self.token += 1;
        self.timer.stop();
        if let Some(mut old) = self.backend.take() {
            old.dispose();
        }
        self.pending_seek = None;
        self.play_when_ready = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.set_state(PlaybackState::Idle);
    }

    /// Apply backend events from the current load and emit progress while
    /// playing. Call once per UI turn.
    pub fn pump(&mut self, now: Instant) {
        for (token, event) in self.sink.drain() {
            if token != self.token {
                log::debug!("dropping {event:?} from superseded load #{token}");
                continue;
            }
            self.handle(token, event);
        }

        if self.state == PlaybackState::Playing && self.timer.due(now) {
            let polled = self
                .backend
                .as_ref()
                .filter(|b| b.needs_polling())
                .map(|b| (b.current_time(), b.duration()));
            if let Some((current, duration)) = polled {
                self.current_time = current;
                if duration.is_finite() && duration > 0.0 {
                    self.duration = duration;
                }
                self.events.push(EngineEvent::TimeUpdate {
                    current,
                    duration: self.duration,
                });
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn handle(&mut self, token: LoadToken, event: BackendEvent) {
        match event {
            BackendEvent::Ready { duration } => {
                if self.state != PlaybackState::Loading {
                    return;
                }
                if duration.is_finite() && duration > 0.0 {
                    self.duration = duration;
                }
                self.set_state(PlaybackState::Ready);
                self.events.push(EngineEvent::Loaded {
                    token,
                    duration: self.duration,
                });
                if let Some(target) = self.pending_seek.take() {
                    let target = self.clamp_to_duration(target);
                    self.seek_backend(target);
                }
                if std::mem::take(&mut self.play_when_ready) {
                    self.start_backend();
                }
            }
            BackendEvent::Failed(reason) => {
                if !matches!(
                    self.state,
                    PlaybackState::Loading | PlaybackState::Ready | PlaybackState::Playing
                ) {
                    return;
                }
                log::warn!("load #{token} failed: {reason}");
                self.timer.stop();
                if let Some(active) = self.backend.as_mut() {
                    active.pause();
                }
                self.pending_seek = None;
                self.play_when_ready = false;
                self.set_state(PlaybackState::Error);
                self.events.push(EngineEvent::LoadFailed { token, reason });
            }
            BackendEvent::Playing => {
                if matches!(self.state, PlaybackState::Ready | PlaybackState::Ended) {
                    self.set_state(PlaybackState::Playing);
                    self.timer.start();
                }
            }
            BackendEvent::Paused => {
                if self.state == PlaybackState::Playing {
                    self.timer.stop();
                    self.set_state(PlaybackState::Ready);
                }
            }
            BackendEvent::PlayRejected(reason) => {
                if self.state == PlaybackState::Playing {
                    log::warn!("play refused: {reason}");
                    self.timer.stop();
                    self.set_state(PlaybackState::Ready);
                    self.events.push(EngineEvent::PlayBlocked(reason));
                }
            }
            BackendEvent::TimeUpdate { current, duration } => {
                if !self.is_loaded() {
                    return;
                }
                self.current_time = current;
                if duration.is_finite() && duration > 0.0 {
                    self.duration = duration;
                }
                self.events.push(EngineEvent::TimeUpdate {
                    current,
                    duration: self.duration,
                });
            }
            BackendEvent::Ended => {
                if self.state == PlaybackState::Playing {
                    self.timer.stop();
                    self.current_time = self.duration;
                    self.set_state(PlaybackState::Ended);
                    self.events.push(EngineEvent::Ended);
                }
            }
        }
    }

    fn start_backend(&mut self) {
        if let Some(active) = self.backend.as_mut() {
            active.play();
        }
        self.set_state(PlaybackState::Playing);
        self.timer.start();
    }

    fn seek_backend(&mut self, seconds: f64) {
        if let Some(active) = self.backend.as_mut() {
            active.seek(seconds);
        }
        self.current_time = seconds;
    }

    fn clamp_to_duration(&self, seconds: f64) -> f64 {
        let duration = self.duration();
        if duration > 0.0 {
            seconds.min(duration)
        } else {
            seconds
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            log::debug!("playback {:?} -> {:?}", self.state, state);
            self.state = state;
            self.events.push(EngineEvent::StateChanged(state));
        }
    }
}

impl<F: BackendFactory> Drop for PlaybackEngine<F> {
    fn drop(&mut self) {
        if let Some(mut active) = self.backend.take() {
            active.dispose();
        }
    }
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
