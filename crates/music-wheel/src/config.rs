use serde::Deserialize;
use std::time::Duration;

/// Tunables for the wheel, the engine and the control panel.
///
/// Every field has a default; a host page may override any subset through
/// [`WheelConfig::from_json`].
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WheelConfig {
    // Layout
    pub mobile_breakpoint: f32,
    pub desktop_canvas_size: f32,
    pub mobile_canvas_size: f32,

    // Rings, indexed by style declaration order (wrapping)
    pub desktop_radii: Vec<f32>,
    pub mobile_radii: Vec<f32>,
    pub default_radius: f32,
    pub palette: Vec<String>,

    // Hit-testing
    pub hit_tolerance: f32,

    // Guides
    pub guide_line_opacity: f32,
    pub guide_overshoot: f32,
    pub guide_fallback_length: f32,

    // Playback
    pub default_volume: f64,
    pub progress_interval_ms: u64,

    // Canvas relayout
    pub resize_debounce_ms: u64,

    // Remote storage proxy
    pub proxy_host_pattern: String,
    pub proxy_path: String,

    // Panel
    pub lyrics_preview_chars: usize,
    pub api_base: String,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            mobile_breakpoint: 768.0,
            desktop_canvas_size: 600.0,
            mobile_canvas_size: 500.0,

            desktop_radii: vec![225.0, 195.0, 165.0, 135.0, 105.0, 75.0, 45.0, 15.0],
            mobile_radii: vec![195.0, 169.0, 143.0, 117.0, 91.0, 65.0, 39.0, 13.0],
            default_radius: 100.0,
            palette: ["#d13b3b", "#9b3480", "#513c99", "#2373a1", "#1da9a0"]
                .into_iter()
                .map(String::from)
                .collect(),

            hit_tolerance: 10.0,

            guide_line_opacity: 0.08,
            guide_overshoot: 1.15,
            guide_fallback_length: 200.0,

            default_volume: 0.7,
            progress_interval_ms: 100,

            resize_debounce_ms: 100,

            proxy_host_pattern: "r2.dev".to_string(),
            proxy_path: "/api/proxy/audio".to_string(),

            lyrics_preview_chars: 200,
            api_base: String::new(),
        }
    }
}

impl WheelConfig {
    /// Parse a partial override; missing fields keep their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Desktop/mobile base radii for the style at `index`, wrapping past the end.
    pub fn radii_for_index(&self, index: usize) -> (f32, f32) {
        let pick = |radii: &[f32]| {
            if radii.is_empty() {
                self.default_radius
            } else {
                radii[index % radii.len()]
            }
        };
        (pick(&self.desktop_radii), pick(&self.mobile_radii))
    }

    pub fn palette_color(&self, index: usize) -> &str {
        if self.palette.is_empty() {
            "#ffffff"
        } else {
            &self.palette[index % self.palette.len()]
        }
    }

    pub fn is_mobile_width(&self, width: f32) -> bool {
        width <= self.mobile_breakpoint
    }
}
