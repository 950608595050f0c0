use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::album::AudioSource;
use crate::config::WheelConfig;
use crate::{Result, WheelError};

/// Monotonic id of a `load` request. Backend events carry the token of the
/// load they belong to so superseded loads can be ignored.
pub type LoadToken = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Native decode-and-play of a URL.
    DirectMedia,
    /// Third-party embedded video player driven by video id.
    EmbeddedVideo,
}

/// What a backend is asked to load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaSource {
    Direct { url: String },
    Embedded { video_id: String },
}

impl MediaSource {
    pub fn kind(&self) -> BackendKind {
        match self {
            MediaSource::Direct { .. } => BackendKind::DirectMedia,
            MediaSource::Embedded { .. } => BackendKind::EmbeddedVideo,
        }
    }

    /// Direct URLs are routed through the proxy when they point at remote storage.
    pub fn from_audio(source: &AudioSource, config: &WheelConfig) -> Self {
        match source {
            AudioSource::File { url } => MediaSource::Direct {
                url: AudioSource::playable_url(url, config),
            },
            AudioSource::YouTube { video_id } => MediaSource::Embedded {
                video_id: video_id.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackendEvent {
    /// Media is buffered enough to play; `duration` may still be 0 for
    /// embedded players.
    Ready { duration: f64 },
    /// Load or decode failure, or an embedded player error code.
    Failed(String),
    Playing,
    Paused,
    /// `play()` was refused (usually autoplay before a user gesture).
    PlayRejected(String),
    TimeUpdate { current: f64, duration: f64 },
    Ended,
}

/// State codes of the embedded video player's `onStateChange`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddedPlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl EmbeddedPlayerState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    /// `play_requested` is set between a play call and the player confirming
    /// it. Falling back to unstarted or cued in that window means the browser
    /// refused to start playback.
    pub fn event(self, play_requested: bool) -> Option<BackendEvent> {
        match self {
            Self::Playing => Some(BackendEvent::Playing),
            Self::Paused => Some(BackendEvent::Paused),
            Self::Ended => Some(BackendEvent::Ended),
            Self::Unstarted | Self::Cued if play_requested => Some(BackendEvent::PlayRejected(
                "the browser blocked playback".into(),
            )),
            Self::Unstarted | Self::Cued | Self::Buffering => None,
        }
    }
}

/// Error for an embedded player `onError` code.
pub fn embedded_error(code: i32) -> WheelError {
    let reason = match code {
        2 => "invalid video id".to_string(),
        5 => "video cannot be played in the HTML5 player".to_string(),
        100 => "video not found".to_string(),
        101 | 150 => "video owner does not allow embedding".to_string(),
        other => format!("embedded player error {other}"),
    };
    WheelError::Backend(reason)
}

/// Shared queue browser callbacks push into; the engine drains it on its turn.
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    queue: Rc<RefCell<VecDeque<(LoadToken, BackendEvent)>>>,
}

impl EventSink {
    pub fn emit(&self, token: LoadToken, event: BackendEvent) {
        self.queue.borrow_mut().push_back((token, event));
    }

    pub fn drain(&self) -> Vec<(LoadToken, BackendEvent)> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// One playback implementation. Calls that need a loaded medium are no-ops
/// until the backend has reported `Ready`; the engine never issues them earlier.
pub trait MediaBackend {
    fn kind(&self) -> BackendKind;

    /// Start loading asynchronously; completion arrives as an event tagged `token`.
    fn load(&mut self, source: &MediaSource, token: LoadToken);

    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f64);

    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;

    /// `true` when the backend has no native time events and must be polled.
    fn needs_polling(&self) -> bool;

    /// Silence and release everything. The backend is dropped right after.
    fn dispose(&mut self);
}

pub trait BackendFactory {
    fn create(&mut self, kind: BackendKind, sink: EventSink) -> Result<Box<dyn MediaBackend>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_preserves_order_and_empties() {
        let sink = EventSink::default();
        let other = sink.clone();
        other.emit(1, BackendEvent::Ready { duration: 3.0 });
        other.emit(2, BackendEvent::Ended);
        assert!(!sink.is_empty());
        assert_eq!(
            sink.drain(),
            vec![(1, BackendEvent::Ready { duration: 3.0 }), (2, BackendEvent::Ended)]
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn files_on_remote_storage_become_proxied_direct_sources() {
        let config = WheelConfig::default();
        let source = MediaSource::from_audio(
            &AudioSource::File {
                url: "https://x.r2.dev/s.mp3".into(),
            },
            &config,
        );
        assert_eq!(
            source,
            MediaSource::Direct {
                url: "/api/proxy/audio?url=https%3A%2F%2Fx.r2.dev%2Fs.mp3".into()
            }
        );
        let yt = MediaSource::from_audio(&AudioSource::YouTube { video_id: "abc".into() }, &config);
        assert_eq!(yt.kind(), BackendKind::EmbeddedVideo);
    }

    #[test]
    fn embedded_player_falling_back_after_play_is_a_refusal() {
        let unstarted = EmbeddedPlayerState::from_code(-1).unwrap();
        let cued = EmbeddedPlayerState::from_code(5).unwrap();
        assert!(matches!(unstarted.event(true), Some(BackendEvent::PlayRejected(_))));
        assert!(matches!(cued.event(true), Some(BackendEvent::PlayRejected(_))));
        assert_eq!(unstarted.event(false), None);
        assert_eq!(cued.event(false), None);

        assert_eq!(
            EmbeddedPlayerState::from_code(3).unwrap().event(true),
            None
        );
        assert_eq!(
            EmbeddedPlayerState::from_code(1).unwrap().event(true),
            Some(BackendEvent::Playing)
        );
        assert_eq!(
            EmbeddedPlayerState::from_code(0).unwrap().event(false),
            Some(BackendEvent::Ended)
        );
        assert_eq!(EmbeddedPlayerState::from_code(4), None);
    }

    #[test]
    fn embedded_error_codes_read_as_playback_errors() {
        assert_eq!(embedded_error(100).to_string(), "video not found");
        assert_eq!(embedded_error(150).to_string(), embedded_error(101).to_string());
        assert!(matches!(embedded_error(7), WheelError::Backend(text) if text.contains('7')));
    }
}
