//! In-memory backends for engine and controller tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::backend::{
    BackendEvent, BackendFactory, BackendKind, EventSink, LoadToken, MediaBackend, MediaSource,
};
use crate::{Result, WheelError};

#[derive(Clone, Debug, PartialEq)]
pub struct MockBackendState {
    pub kind: BackendKind,
    pub source: Option<MediaSource>,
    pub token: LoadToken,
    pub loads: usize,
    pub playing: bool,
    pub time: f64,
    pub duration: f64,
    pub volume: f64,
    pub disposed: bool,
}

type Shared = Rc<RefCell<MockBackendState>>;

/// Every backend a [`MockFactory`] ever created, in creation order.
#[derive(Clone, Default)]
pub struct MockRegistry {
    created: Rc<RefCell<Vec<(Shared, EventSink)>>>,
    fail_next: Rc<Cell<bool>>,
}

impl MockRegistry {
    pub fn backends(&self) -> Vec<MockBackendState> {
        self.created.borrow().iter().map(|(s, _)| s.borrow().clone()).collect()
    }

    fn live(&self) -> Option<(Shared, EventSink)> {
        self.created
            .borrow()
            .iter()
            .rev()
            .find(|(s, _)| !s.borrow().disposed)
            .cloned()
    }

    pub fn active(&self) -> Option<MockBackendState> {
        self.live().map(|(s, _)| s.borrow().clone())
    }

    pub fn active_sink(&self) -> Option<EventSink> {
        self.live().map(|(_, sink)| sink)
    }

    pub fn live_count(&self) -> usize {
        self.created.borrow().iter().filter(|(s, _)| !s.borrow().disposed).count()
    }

    pub fn playing_count(&self) -> usize {
        self.created.borrow().iter().filter(|(s, _)| s.borrow().playing).count()
    }

    pub fn fail_next_create(&self) {
        self.fail_next.set(true);
    }

    /// Emit `event` for the active backend's current load.
    pub fn emit(&self, event: BackendEvent) {
        if let Some((state, sink)) = self.live() {
            let token = state.borrow().token;
            sink.emit(token, event);
        }
    }

    pub fn resolve(&self, duration: f64) {
        if let Some((state, _)) = self.live() {
            state.borrow_mut().duration = duration;
        }
        self.emit(BackendEvent::Ready { duration });
    }

    pub fn resolve_token(&self, token: LoadToken, duration: f64) {
        if let Some((_, sink)) = self.created.borrow().last() {
            sink.emit(token, BackendEvent::Ready { duration });
        }
    }

    pub fn fail(&self, reason: &str) {
        self.emit(BackendEvent::Failed(reason.to_string()));
    }

    pub fn reject_play(&self, reason: &str) {
        if let Some((state, _)) = self.live() {
            state.borrow_mut().playing = false;
        }
        self.emit(BackendEvent::PlayRejected(reason.to_string()));
    }

    pub fn finish(&self) {
        if let Some((state, _)) = self.live() {
            let mut s = state.borrow_mut();
            s.playing = false;
            s.time = s.duration;
        }
        self.emit(BackendEvent::Ended);
    }

    pub fn advance(&self, seconds: f64) {
        if let Some((state, _)) = self.live() {
            let mut s = state.borrow_mut();
            if s.playing {
                s.time += seconds;
            }
        }
    }
}

pub struct MockFactory {
    registry: MockRegistry,
}

impl MockFactory {
    pub fn new(registry: &MockRegistry) -> Self {
        Self {
            registry: registry.clone(),
        }
    }
}

impl BackendFactory for MockFactory {
    fn create(&mut self, kind: BackendKind, sink: EventSink) -> Result<Box<dyn MediaBackend>> {
        if self.registry.fail_next.replace(false) {
            return Err(WheelError::Backend(format!("{kind:?} unavailable")));
        }
        let state = Rc::new(RefCell::new(MockBackendState {
            kind,
            source: None,
            token: 0,
            loads: 0,
            playing: false,
            time: 0.0,
            duration: 0.0,
            volume: 1.0,
            disposed: false,
        }));
        self.registry.created.borrow_mut().push((state.clone(), sink));
        Ok(Box::new(MockBackend { state }))
    }
}

struct MockBackend {
    state: Shared,
}

impl MediaBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.state.borrow().kind
    }

    fn load(&mut self, source: &MediaSource, token: LoadToken) {
        let mut s = self.state.borrow_mut();
        s.source = Some(source.clone());
        s.token = token;
        s.loads += 1;
        s.playing = false;
        s.time = 0.0;
        s.duration = 0.0;
    }

    fn play(&mut self) {
        let mut s = self.state.borrow_mut();
        if s.source.is_some() && !s.disposed {
            s.playing = true;
        }
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        self.state.borrow_mut().time = seconds;
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.borrow_mut().volume = volume;
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().time
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn needs_polling(&self) -> bool {
        self.state.borrow().kind == BackendKind::EmbeddedVideo
    }

    fn dispose(&mut self) {
        let mut s = self.state.borrow_mut();
        s.playing = false;
        s.disposed = true;
    }
}
