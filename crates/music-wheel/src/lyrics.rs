use std::collections::HashMap;

pub const NO_LYRICS: &str = "No lyrics available";
pub const LYRICS_FAILED: &str = "Failed to load lyrics";
pub const LYRICS_LOADING: &str = "Loading lyrics...";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lyrics {
    /// The style has no lyrics URL.
    Unavailable,
    Loading,
    Loaded(String),
    Failed,
}

impl Lyrics {
    pub fn full_text(&self) -> &str {
        match self {
            Lyrics::Unavailable => NO_LYRICS,
            Lyrics::Loading => LYRICS_LOADING,
            Lyrics::Loaded(text) => text,
            Lyrics::Failed => LYRICS_FAILED,
        }
    }

    pub fn preview(&self, chars: usize) -> String {
        match self {
            Lyrics::Loaded(text) => preview(text, chars),
            other => other.full_text().to_string(),
        }
    }
}

/// First `chars` characters followed by `...` when the text is longer.
pub fn preview(text: &str, chars: usize) -> String {
    match text.char_indices().nth(chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Lyrics per (segment, style). Failures are cached too but may be retried.
#[derive(Debug, Default)]
pub struct LyricsCache {
    entries: HashMap<(u32, String), Lyrics>,
}

impl LyricsCache {
    pub fn get(&self, segment: u32, style: &str) -> Option<&Lyrics> {
        self.entries.get(&(segment, style.to_string()))
    }

    /// Marks the pair as loading and returns `true` when a fetch should start.
    pub fn begin(&mut self, segment: u32, style: &str) -> bool {
        let entry = self
            .entries
            .entry((segment, style.to_string()))
            .or_insert(Lyrics::Failed);
        match entry {
            Lyrics::Loaded(_) | Lyrics::Loading => false,
            Lyrics::Unavailable | Lyrics::Failed => {
                *entry = Lyrics::Loading;
                true
            }
        }
    }

    pub fn mark_unavailable(&mut self, segment: u32, style: &str) {
        self.entries
            .insert((segment, style.to_string()), Lyrics::Unavailable);
    }

    /// Store a fetch result. Only a pair still marked loading accepts one.
    pub fn finish(&mut self, segment: u32, style: &str, text: Option<String>) -> bool {
        let Some(entry) = self.entries.get_mut(&(segment, style.to_string())) else {
            return false;
        };
        if *entry != Lyrics::Loading {
            return false;
        }
        *entry = match text {
            Some(text) => Lyrics::Loaded(text),
            None => Lyrics::Failed,
        };
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
