//! Browser backends: `<audio>` for direct media and the YouTube IFrame API
//! for embedded video. Every callback only pushes into the [`EventSink`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlAudioElement, MediaError};

use super::backend::{
    embedded_error, BackendEvent, BackendFactory, BackendKind, EmbeddedPlayerState, EventSink,
    LoadToken, MediaBackend, MediaSource,
};
use crate::{Result, WheelError};

const IFRAME_API_URL: &str = "https://www.youtube.com/iframe_api";
const IFRAME_API_SCRIPT_ID: &str = "music_wheel_iframe_api";
const PLAYER_CONTAINER_ID: &str = "music_wheel_youtube";
const BOOTSTRAP_POLL_MS: i32 = 100;

/// `name: message` of a thrown DOMException, or its debug form.
fn js_reason(value: &JsValue) -> String {
    let field = |key: &str| {
        Reflect::get(value, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_string())
    };
    match (field("name"), field("message")) {
        (Some(name), Some(message)) => format!("{name}: {message}"),
        (None, Some(message)) => message,
        _ => value.as_string().unwrap_or_else(|| format!("{value:?}")),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub struct WebBackendFactory;

impl BackendFactory for WebBackendFactory {
    fn create(&mut self, kind: BackendKind, sink: EventSink) -> Result<Box<dyn MediaBackend>> {
        Ok(match kind {
            BackendKind::DirectMedia => Box::new(DirectMediaBackend::new(sink)?),
            BackendKind::EmbeddedVideo => Box::new(EmbeddedVideoBackend::new(sink)),
        })
    }
}

// ===== Direct media =====

type Listener = Closure<dyn FnMut(web_sys::Event)>;

pub struct DirectMediaBackend {
    audio: HtmlAudioElement,
    /// Read by listeners when they fire so events follow the current load.
    token: Rc<Cell<LoadToken>>,
    sink: EventSink,
    listeners: Vec<(&'static str, Listener)>,
}

impl DirectMediaBackend {
    pub fn new(sink: EventSink) -> Result<Self> {
        let audio = HtmlAudioElement::new()?;
        audio.set_preload("auto");
        let mut backend = Self {
            audio,
            token: Rc::new(Cell::new(0)),
            sink,
            listeners: Vec::new(),
        };
        backend.listen("canplay", |audio| {
            Some(BackendEvent::Ready {
                duration: finite_or_zero(audio.duration()),
            })
        })?;
        backend.listen("error", |audio| {
            let reason = match audio.error().map(|e| e.code()) {
                Some(MediaError::MEDIA_ERR_ABORTED) => "media load aborted",
                Some(MediaError::MEDIA_ERR_NETWORK) => "network error while loading media",
                Some(MediaError::MEDIA_ERR_DECODE) => "media could not be decoded",
                Some(MediaError::MEDIA_ERR_SRC_NOT_SUPPORTED) => "media source not supported",
                _ => "unknown media error",
            };
            Some(BackendEvent::Failed(reason.to_string()))
        })?;
        backend.listen("timeupdate", |audio| {
            Some(BackendEvent::TimeUpdate {
                current: audio.current_time(),
                duration: finite_or_zero(audio.duration()),
            })
        })?;
        backend.listen("playing", |_| Some(BackendEvent::Playing))?;
        backend.listen("pause", |_| Some(BackendEvent::Paused))?;
        backend.listen("ended", |_| Some(BackendEvent::Ended))?;
        Ok(backend)
    }

    fn listen(
        &mut self,
        name: &'static str,
        map: impl Fn(&HtmlAudioElement) -> Option<BackendEvent> + 'static,
    ) -> Result<()> {
        let audio = self.audio.clone();
        let token = self.token.clone();
        let sink = self.sink.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(event) = map(&audio) {
                sink.emit(token.get(), event);
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        self.audio
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        self.listeners.push((name, closure));
        Ok(())
    }
}

impl MediaBackend for DirectMediaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DirectMedia
    }

    fn load(&mut self, source: &MediaSource, token: LoadToken) {
        let MediaSource::Direct { url } = source else {
            self.sink
                .emit(token, BackendEvent::Failed("not a direct media source".into()));
            return;
        };
        self.token.set(token);
        self.audio.set_src(url);
        self.audio.load();
    }

    fn play(&mut self) {
        let token = self.token.get();
        match self.audio.play() {
            Ok(promise) => {
                let sink = self.sink.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(err) = JsFuture::from(promise).await {
                        sink.emit(token, BackendEvent::PlayRejected(js_reason(&err)));
                    }
                });
            }
            Err(err) => self
                .sink
                .emit(token, BackendEvent::PlayRejected(js_reason(&err))),
        }
    }

    fn pause(&mut self) {
        if let Err(err) = self.audio.pause() {
            log::warn!("audio pause failed: {}", js_reason(&err));
        }
    }

    fn seek(&mut self, seconds: f64) {
        self.audio.set_current_time(seconds);
    }

    fn set_volume(&mut self, volume: f64) {
        self.audio.set_volume(volume);
    }

    fn current_time(&self) -> f64 {
        self.audio.current_time()
    }

    fn duration(&self) -> f64 {
        finite_or_zero(self.audio.duration())
    }

    fn needs_polling(&self) -> bool {
        false
    }

    fn dispose(&mut self) {
        self.pause();
        for (name, closure) in self.listeners.drain(..) {
            let _ = self
                .audio
                .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
        let _ = self.audio.remove_attribute("src");
        self.audio.load();
    }
}

// ===== Embedded video =====

#[derive(Default)]
struct EmbeddedShared {
    player: Option<JsValue>,
    ready: bool,
    volume: f64,
    container: Option<web_sys::Element>,
    /// Video waiting for the IFrame API script.
    pending: Option<(String, LoadToken)>,
    /// Set by `play` until the player reports playing.
    play_requested: bool,
    bootstrap: Option<i32>,
    bootstrap_tick: Option<Closure<dyn FnMut()>>,
    /// Player event handlers; live as long as the player they were given to.
    handlers: Vec<Closure<dyn FnMut(JsValue)>>,
}

pub struct EmbeddedVideoBackend {
    shared: Rc<RefCell<EmbeddedShared>>,
    sink: EventSink,
}

impl EmbeddedVideoBackend {
    pub fn new(sink: EventSink) -> Self {
        Self {
            shared: Rc::new(RefCell::new(EmbeddedShared {
                volume: 1.0,
                ..Default::default()
            })),
            sink,
        }
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Option<JsValue> {
        let shared = self.shared.borrow();
        if !shared.ready {
            return None;
        }
        call_player(shared.player.as_ref()?, method, args)
    }

    fn start_bootstrap(&self) -> Result<()> {
        ensure_api_script()?;
        if self.shared.borrow().bootstrap.is_some() {
            return Ok(());
        }
        let weak = Rc::downgrade(&self.shared);
        let sink = self.sink.clone();
        let tick = Closure::wrap(Box::new(move || {
            if !api_ready() {
                return;
            }
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let pending = {
                let mut s = shared.borrow_mut();
                if let (Some(id), Some(window)) = (s.bootstrap.take(), web_sys::window()) {
                    window.clear_interval_with_handle(id);
                }
                s.pending.take()
            };
            if let Some((video_id, token)) = pending {
                log::debug!("iframe api ready, creating player for load #{token}");
                if let Err(err) = create_player(&shared, &video_id, token, &sink) {
                    sink.emit(token, BackendEvent::Failed(err.to_string()));
                }
            }
        }) as Box<dyn FnMut()>);
        let window = web_sys::window().ok_or(WheelError::MissingElement("window"))?;
        let id = window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            BOOTSTRAP_POLL_MS,
        )?;
        let mut shared = self.shared.borrow_mut();
        shared.bootstrap = Some(id);
        shared.bootstrap_tick = Some(tick);
        Ok(())
    }
}

impl MediaBackend for EmbeddedVideoBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::EmbeddedVideo
    }

    fn load(&mut self, source: &MediaSource, token: LoadToken) {
        let MediaSource::Embedded { video_id } = source else {
            self.sink
                .emit(token, BackendEvent::Failed("not an embedded video source".into()));
            return;
        };
        destroy_player(&mut self.shared.borrow_mut());

        let result = if api_ready() {
            create_player(&self.shared, video_id, token, &self.sink)
        } else {
            self.shared.borrow_mut().pending = Some((video_id.clone(), token));
            self.start_bootstrap()
        };
        if let Err(err) = result {
            self.sink.emit(token, BackendEvent::Failed(err.to_string()));
        }
    }

    fn play(&mut self) {
        self.shared.borrow_mut().play_requested = true;
        self.call("playVideo", &[]);
    }

    fn pause(&mut self) {
        self.shared.borrow_mut().play_requested = false;
        self.call("pauseVideo", &[]);
    }

    fn seek(&mut self, seconds: f64) {
        self.call("seekTo", &[JsValue::from_f64(seconds), JsValue::TRUE]);
    }

    fn set_volume(&mut self, volume: f64) {
        self.shared.borrow_mut().volume = volume;
        self.call("setVolume", &[JsValue::from_f64(volume * 100.0)]);
    }

    fn current_time(&self) -> f64 {
        self.call("getCurrentTime", &[])
            .and_then(|v| v.as_f64())
            .map_or(0.0, finite_or_zero)
    }

    fn duration(&self) -> f64 {
        self.call("getDuration", &[])
            .and_then(|v| v.as_f64())
            .map_or(0.0, finite_or_zero)
    }

    fn needs_polling(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        let mut shared = self.shared.borrow_mut();
        if let (Some(id), Some(window)) = (shared.bootstrap.take(), web_sys::window()) {
            window.clear_interval_with_handle(id);
        }
        shared.pending = None;
        destroy_player(&mut shared);
    }
}

fn call_player(player: &JsValue, method: &str, args: &[JsValue]) -> Option<JsValue> {
    let function = Reflect::get(player, &JsValue::from_str(method))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    let args: Array = args.iter().collect();
    match function.apply(player, &args) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("YT player {method} failed: {}", js_reason(&err));
            None
        }
    }
}

fn api_ready() -> bool {
    web_sys::window()
        .and_then(|w| Reflect::get(&w, &JsValue::from_str("YT")).ok())
        .filter(|yt| yt.is_object())
        .and_then(|yt| Reflect::get(&yt, &JsValue::from_str("Player")).ok())
        .is_some_and(|ctor| ctor.is_function())
}

fn ensure_api_script() -> Result<()> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or(WheelError::MissingElement("document"))?;
    if document.get_element_by_id(IFRAME_API_SCRIPT_ID).is_some() {
        return Ok(());
    }
    let script = document
        .create_element("script")?
        .dyn_into::<web_sys::HtmlScriptElement>()
        .map_err(|_| WheelError::Js("script element has the wrong type".into()))?;
    script.set_id(IFRAME_API_SCRIPT_ID);
    script.set_src(IFRAME_API_URL);
    let head = document.head().ok_or(WheelError::MissingElement("head"))?;
    head.append_child(&script)?;
    log::debug!("injected YouTube IFrame API script");
    Ok(())
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<()> {
    Reflect::set(target, &JsValue::from_str(key), value)?;
    Ok(())
}

fn destroy_player(shared: &mut EmbeddedShared) {
    if let Some(player) = shared.player.take() {
        call_player(&player, "destroy", &[]);
    }
    if let Some(container) = shared.container.take() {
        container.remove();
    }
    shared.ready = false;
    shared.play_requested = false;
    shared.handlers.clear();
}

/// Build a hidden player for `video_id`. Handlers capture `token`, so a
/// destroyed player can never report for a newer load.
fn create_player(
    shared: &Rc<RefCell<EmbeddedShared>>,
    video_id: &str,
    token: LoadToken,
    sink: &EventSink,
) -> Result<()> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or(WheelError::MissingElement("document"))?;
    let body = document.body().ok_or(WheelError::MissingElement("body"))?;

    let container = document.create_element("div")?;
    container.set_id(PLAYER_CONTAINER_ID);
    container.set_attribute(
        "style",
        "position:absolute; top:-9999px; left:-9999px; width:1px; height:1px;",
    )?;
    let target = document.create_element("div")?;
    container.append_child(&target)?;
    body.append_child(&container)?;

    let weak: Weak<RefCell<EmbeddedShared>> = Rc::downgrade(shared);
    let on_ready = {
        let sink = sink.clone();
        let weak = weak.clone();
        Closure::wrap(Box::new(move |_event: JsValue| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let (player, volume) = {
                let mut s = shared.borrow_mut();
                s.ready = true;
                (s.player.clone(), s.volume)
            };
            let duration = player.as_ref().map_or(0.0, |p| {
                call_player(p, "setVolume", &[JsValue::from_f64(volume * 100.0)]);
                call_player(p, "getDuration", &[])
                    .and_then(|v| v.as_f64())
                    .map_or(0.0, finite_or_zero)
            });
            sink.emit(token, BackendEvent::Ready { duration });
        }) as Box<dyn FnMut(JsValue)>)
    };
    let on_state_change = {
        let sink = sink.clone();
        let weak = weak.clone();
        Closure::wrap(Box::new(move |event: JsValue| {
            let Some(state) = Reflect::get(&event, &JsValue::from_str("data"))
                .ok()
                .and_then(|v| v.as_f64())
                .and_then(|code| EmbeddedPlayerState::from_code(code as i32))
            else {
                return;
            };
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let play_requested = {
                let mut s = shared.borrow_mut();
                let requested = s.play_requested;
                if matches!(
                    state,
                    EmbeddedPlayerState::Playing
                        | EmbeddedPlayerState::Unstarted
                        | EmbeddedPlayerState::Cued
                ) {
                    s.play_requested = false;
                }
                requested
            };
            if let Some(mapped) = state.event(play_requested) {
                sink.emit(token, mapped);
            }
        }) as Box<dyn FnMut(JsValue)>)
    };
    let on_error = {
        let sink = sink.clone();
        Closure::wrap(Box::new(move |event: JsValue| {
            let code = Reflect::get(&event, &JsValue::from_str("data"))
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(-1.0);
            let err = embedded_error(code as i32);
            sink.emit(token, BackendEvent::Failed(err.to_string()));
        }) as Box<dyn FnMut(JsValue)>)
    };

    let player_vars = Object::new();
    for (key, value) in [
        ("autoplay", 0),
        ("controls", 0),
        ("disablekb", 1),
        ("fs", 0),
        ("modestbranding", 1),
        ("playsinline", 1),
    ] {
        set(&player_vars, key, &JsValue::from(value))?;
    }
    let events = Object::new();
    set(&events, "onReady", on_ready.as_ref())?;
    set(&events, "onStateChange", on_state_change.as_ref())?;
    set(&events, "onError", on_error.as_ref())?;

    let options = Object::new();
    set(&options, "height", &JsValue::from_str("1"))?;
    set(&options, "width", &JsValue::from_str("1"))?;
    set(&options, "videoId", &JsValue::from_str(video_id))?;
    set(&options, "playerVars", &player_vars)?;
    set(&options, "events", &events)?;

    let window = web_sys::window().ok_or(WheelError::MissingElement("window"))?;
    let yt = Reflect::get(&window, &JsValue::from_str("YT"))?;
    let ctor = Reflect::get(&yt, &JsValue::from_str("Player"))?
        .dyn_into::<Function>()
        .map_err(|_| WheelError::Backend("YT.Player is not a constructor".into()))?;
    let player = Reflect::construct(&ctor, &Array::of2(&target, &options))?;

    let mut s = shared.borrow_mut();
    s.player = Some(player);
    s.container = Some(container);
    s.handlers = vec![on_ready, on_state_change, on_error];
    Ok(())
}
