use thiserror::Error;

#[derive(Debug, Error)]
pub enum WheelError {
    #[error("no audio for track {segment} in style '{style}'")]
    Unavailable { segment: u32, style: String },

    #[error("segment {0} has no track")]
    UnknownSegment(u32),

    #[error("no album loaded")]
    NoAlbum,

    #[error("select a track first")]
    NoSelection,

    #[error("nothing loaded")]
    NothingLoaded,

    #[error("server error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Reported by a playback backend; the text is shown as is.
    #[error("{0}")]
    Backend(String),

    #[error("missing page element '{0}'")]
    MissingElement(&'static str),

    #[error("browser error: {0}")]
    Js(String),
}

pub type Result<T> = std::result::Result<T, WheelError>;

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for WheelError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        let text = value
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(&value, &"message".into())
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{value:?}"));
        WheelError::Js(text)
    }
}
