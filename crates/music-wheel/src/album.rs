//! Album data: the JSON document served by `/api/album/load` and the
//! in-memory model the wheel and the controller work from.

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::WheelConfig;

/// Characters left alone by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

// ===== Wire format =====

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDocument {
    #[serde(default)]
    pub album_name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub styles: Option<Vec<StyleDefinition>>,
    #[serde(default)]
    pub tracks: IndexMap<String, TrackDocument>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct StyleDefinition {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TrackDocument {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    // Declaration order matters: style inference reads the first track's keys.
    #[serde(default)]
    pub styles: IndexMap<String, StyleAudioDocument>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StyleAudioDocument {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub youtube_id: Option<String>,
    #[serde(default)]
    pub audio_type: Option<String>,
    #[serde(default)]
    pub lyrics_url: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from)
}

impl StyleAudioDocument {
    /// `None` when neither a URL nor a video id is present.
    pub fn to_audio_ref(&self) -> Option<StyleAudioRef> {
        let url = non_empty(self.url.as_ref());
        let youtube_id = non_empty(self.youtube_id.as_ref());
        let wants_youtube = self.audio_type.as_deref() == Some("youtube");

        let source = match (url, youtube_id) {
            (_, Some(video_id)) if wants_youtube => AudioSource::YouTube { video_id },
            (Some(url), _) => AudioSource::File { url },
            (None, Some(video_id)) => AudioSource::YouTube { video_id },
            (None, None) => return None,
        };
        Some(StyleAudioRef {
            source,
            lyrics_url: non_empty(self.lyrics_url.as_ref()),
        })
    }
}

// ===== Model =====

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioSource {
    File { url: String },
    YouTube { video_id: String },
}

impl AudioSource {
    /// The URL the direct-media backend should fetch. Remote-storage URLs go
    /// through the same-origin proxy.
    pub fn playable_url(url: &str, config: &WheelConfig) -> String {
        if !config.proxy_host_pattern.is_empty() && url.contains(&config.proxy_host_pattern) {
            format!("{}?url={}", config.proxy_path, encode_uri_component(url))
        } else {
            url.to_string()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleAudioRef {
    pub source: AudioSource,
    pub lyrics_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub number: u32,
    pub name: String,
    pub artist: String,
    pub icon: String,
    /// Only styles that have audio; a missing key means "no audio".
    pub styles: BTreeMap<String, StyleAudioRef>,
}

impl Track {
    pub fn audio(&self, style: &str) -> Option<&StyleAudioRef> {
        self.styles.get(style)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Album {
    pub name: String,
    pub artist: String,
    pub tracks: BTreeMap<u32, Track>,
}

impl Album {
    pub fn from_document(doc: &AlbumDocument) -> Self {
        let mut tracks = BTreeMap::new();
        for (key, data) in &doc.tracks {
            let Ok(segment) = key.trim().parse::<u32>() else {
                log::warn!("skipping track with non-numeric segment key '{key}'");
                continue;
            };
            if segment == 0 {
                log::warn!("skipping track with segment 0");
                continue;
            }
            let styles = data
                .styles
                .iter()
                .filter_map(|(style, audio)| audio.to_audio_ref().map(|r| (style.clone(), r)))
                .collect();
            tracks.insert(
                segment,
                Track {
                    number: data.number.unwrap_or(segment),
                    name: non_empty(data.name.as_ref()).unwrap_or_else(|| format!("Track {segment}")),
                    artist: non_empty(data.artist.as_ref())
                        .unwrap_or_else(|| "Unknown Artist".to_string()),
                    icon: non_empty(data.icon.as_ref()).unwrap_or_else(|| "🎵".to_string()),
                    styles,
                },
            );
        }
        Self {
            name: doc.album_name.clone(),
            artist: doc.artist.clone(),
            tracks,
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, segment: u32) -> Option<&Track> {
        self.tracks.get(&segment)
    }

    pub fn audio(&self, segment: u32, style: &str) -> Option<&StyleAudioRef> {
        self.track(segment).and_then(|t| t.audio(style))
    }

    /// Neighbouring segment by numeric key order (not by position in the wheel).
    pub fn next_segment(&self, segment: u32) -> Option<u32> {
        self.tracks
            .range(segment.checked_add(1)?..)
            .next()
            .map(|(k, _)| *k)
    }

    pub fn previous_segment(&self, segment: u32) -> Option<u32> {
        self.tracks.range(..segment).next_back().map(|(k, _)| *k)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// `tracks` segments each get a file for every listed style; `missing`
    /// removes individual (segment, style) pairs.
    pub fn album(tracks: u32, styles: &[&str], missing: &[(u32, &str)]) -> Album {
        let mut doc = AlbumDocument {
            album_name: "Fixture".into(),
            artist: "Band".into(),
            ..Default::default()
        };
        for segment in 1..=tracks {
            let mut track = TrackDocument {
                name: Some(format!("Song {segment}")),
                ..Default::default()
            };
            for style in styles {
                if missing.contains(&(segment, *style)) {
                    continue;
                }
                track.styles.insert(
                    (*style).to_string(),
                    StyleAudioDocument {
                        url: Some(format!("/audio/{segment}-{style}.mp3")),
                        audio_type: Some("file".into()),
                        ..Default::default()
                    },
                );
            }
            doc.tracks.insert(segment.to_string(), track);
        }
        Album::from_document(&doc)
    }
}
