use egui::Color32;

use crate::album::{AlbumDocument, StyleDefinition};
use crate::config::WheelConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct StyleEntry {
    pub key: String,
    pub display_name: String,
    /// CSS-ish color as it came from the album (`#rrggbb`, `#rgb`, `rgb(..)`).
    pub color: String,
    pub render_radius: f32,
    pub mobile_render_radius: f32,
}

impl StyleEntry {
    pub fn color32(&self) -> Color32 {
        parse_css_color(&self.color).unwrap_or(Color32::GRAY)
    }

    pub fn radius(&self, mobile: bool) -> f32 {
        if mobile {
            self.mobile_render_radius
        } else {
            self.render_radius
        }
    }
}

/// Partial update applied by [`StyleConfig::patch`].
#[derive(Clone, Debug, Default)]
pub struct StylePatch {
    pub display_name: Option<String>,
    pub color: Option<String>,
    pub render_radius: Option<f32>,
    pub mobile_render_radius: Option<f32>,
}

/// Style key → ring parameters, kept in declaration order (outermost first).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleConfig {
    entries: Vec<StyleEntry>,
    default_radius: f32,
}

impl StyleConfig {
    pub fn empty(config: &WheelConfig) -> Self {
        Self {
            entries: Vec::new(),
            default_radius: config.default_radius,
        }
    }

    /// Build from style definitions, assigning radii from the config's base
    /// sequences by position. Later duplicates of a key are dropped.
    pub fn from_definitions(definitions: &[StyleDefinition], config: &WheelConfig) -> Self {
        let mut styles = Self::empty(config);
        for def in definitions {
            let key = def
                .key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map_or_else(|| key_from_name(&def.name), String::from);
            if key.is_empty() {
                log::warn!("style without key or name ignored");
                continue;
            }
            if styles.get(&key).is_some() {
                log::warn!("duplicate style key '{key}' ignored");
                continue;
            }
            let (radius, mobile_radius) = config.radii_for_index(styles.entries.len());
            let display_name = if def.name.trim().is_empty() {
                name_from_key(&key)
            } else {
                def.name.clone()
            };
            styles.entries.push(StyleEntry {
                key,
                display_name,
                color: def.color.clone(),
                render_radius: radius,
                mobile_render_radius: mobile_radius,
            });
        }
        styles
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleEntry> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&StyleEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|e| e.key.as_str())
    }

    /// Unknown keys fall back to the configured default radius.
    pub fn radius(&self, key: &str, mobile: bool) -> f32 {
        self.get(key).map_or(self.default_radius, |e| e.radius(mobile))
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map_or(key, |e| e.display_name.as_str())
    }

    /// Returns `false` when no style has that key.
    pub fn patch(&mut self, key: &str, patch: StylePatch) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) else {
            return false;
        };
        if let Some(name) = patch.display_name {
            entry.display_name = name;
        }
        if let Some(color) = patch.color {
            entry.color = color;
        }
        if let Some(r) = patch.render_radius.filter(|r| *r > 0.0) {
            entry.render_radius = r;
        }
        if let Some(r) = patch.mobile_render_radius.filter(|r| *r > 0.0) {
            entry.mobile_render_radius = r;
        }
        true
    }
}

/// Styles for an album: the explicit list when present, otherwise the first
/// track's style keys with palette colors assigned cyclically.
pub fn album_style_definitions(doc: &AlbumDocument, config: &WheelConfig) -> Vec<StyleDefinition> {
    if let Some(explicit) = doc.styles.as_ref().filter(|s| !s.is_empty()) {
        return explicit.clone();
    }
    log::debug!("album '{}' has no style list, inferring from first track", doc.album_name);
    let first = doc
        .tracks
        .iter()
        .filter_map(|(k, t)| k.trim().parse::<u32>().ok().map(|n| (n, t)))
        .min_by_key(|(n, _)| *n)
        .map(|(_, t)| t);
    let Some(first) = first else {
        return Vec::new();
    };
    first
        .styles
        .keys()
        .enumerate()
        .map(|(idx, key)| StyleDefinition {
            key: Some(key.clone()),
            name: name_from_key(key),
            color: config.palette_color(idx).to_string(),
        })
        .collect()
}

/// `"Hip Hop"` → `"hip_hop"`.
pub fn key_from_name(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("_")
}

/// `"hip_hop"` → `"Hip hop"`.
pub fn name_from_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

/// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` and `rgba(r, g, b, a)`.
pub fn parse_css_color(text: &str) -> Option<Color32> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok();
        let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return match hex.len() {
            3 => Some(Color32::from_rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => Some(Color32::from_rgb(pair(0)?, pair(2)?, pair(4)?)),
            8 => Some(Color32::from_rgba_unmultiplied(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        };
    }
    let inner = text
        .strip_prefix("rgba(")
        .or_else(|| text.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
    match parts.as_slice() {
        [r, g, b] => Some(Color32::from_rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let alpha = a.parse::<f32>().ok()?.clamp(0.0, 1.0);
            Some(Color32::from_rgba_unmultiplied(
                channel(r)?,
                channel(g)?,
                channel(b)?,
                (alpha * 255.0).round() as u8,
            ))
        }
        _ => None,
    }
}
