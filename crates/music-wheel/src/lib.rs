//! A radial album player for the browser.
//!
//! Tracks sit on the spokes of a wheel, styles on its rings. Clicking a point
//! plays that track in that style, either as a direct audio file or through an
//! embedded YouTube player, and switching rings keeps the playback position.

pub mod album;
pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod lyrics;
pub mod playback;
pub mod renderer;
pub mod styles;
pub mod ui;

#[cfg(target_arch = "wasm32")]
mod app;

pub use config::WheelConfig;
pub use controller::{StatusKind, StatusMessage, WheelController, WheelEvent};
pub use error::{Result, WheelError};
pub use playback::{PlaybackEngine, PlaybackState};
pub use renderer::{HitPoint, WheelRenderer};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
pub const CANVAS_ID: &str = "music_wheel_canvas";

/// Mount the player on `<canvas id="music_wheel_canvas">`. A `data-config`
/// attribute on the canvas may hold a partial JSON override of [`WheelConfig`].
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> std::result::Result<(), JsValue> {
    use wasm_bindgen::JsCast;

    logging::init(log::Level::Info);

    let canvas = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CANVAS_ID))
        .and_then(|el| el.dyn_into::<web_sys::HtmlCanvasElement>().ok());
    let Some(canvas) = canvas else {
        log::error!("no <canvas id=\"{CANVAS_ID}\"> on the page");
        return Ok(());
    };
    let config = match canvas.get_attribute("data-config") {
        Some(json) => WheelConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => WheelConfig::default(),
    };

    wasm_bindgen_futures::spawn_local(async move {
        let web_options = eframe::WebOptions::default();
        let started = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(move |cc| Ok(Box::new(app::MusicWheelApp::new(cc, config)))),
            )
            .await;
        if let Err(err) = started {
            log::error!("failed to start eframe: {err:?}");
        }
    });
    Ok(())
}
