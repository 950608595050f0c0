//! Request/response contract of the album server.

use serde::Deserialize;

use crate::album::{encode_uri_component, AlbumDocument};
use crate::config::WheelConfig;
use crate::{Result, WheelError};

const SUCCESS: &str = "success";

#[derive(Debug, Deserialize)]
pub struct AlbumListResponse {
    pub status: String,
    #[serde(default)]
    pub albums: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumLoadResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<AlbumDocument>,
    #[serde(default)]
    pub message: Option<String>,
}

fn server_error(status: &str, message: Option<String>) -> WheelError {
    WheelError::Api(message.unwrap_or_else(|| format!("status '{status}'")))
}

impl AlbumListResponse {
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.status == SUCCESS {
            Ok(self.albums)
        } else {
            Err(server_error(&self.status, self.message))
        }
    }
}

impl AlbumLoadResponse {
    pub fn into_result(self) -> Result<AlbumDocument> {
        match (self.status.as_str(), self.data) {
            (SUCCESS, Some(doc)) => Ok(doc),
            (SUCCESS, None) => Err(WheelError::Api("response has no album data".into())),
            (status, _) => Err(server_error(status, self.message)),
        }
    }
}

pub fn album_list_url(config: &WheelConfig) -> String {
    format!("{}/api/albums/list", config.api_base)
}

pub fn album_load_url(config: &WheelConfig, name: &str) -> String {
    format!(
        "{}/api/album/load?album={}",
        config.api_base,
        encode_uri_component(name)
    )
}

pub fn parse_album_list(body: &str) -> Result<Vec<String>> {
    serde_json::from_str::<AlbumListResponse>(body)?.into_result()
}

pub fn parse_album_load(body: &str) -> Result<AlbumDocument> {
    serde_json::from_str::<AlbumLoadResponse>(body)?.into_result()
}

#[cfg(target_arch = "wasm32")]
pub mod web {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, RequestMode, Response};

    use crate::{Result, WheelError};

    pub struct HttpReply {
        pub status: u16,
        pub body: String,
    }

    pub async fn fetch_text(url: &str) -> Result<HttpReply> {
        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);
        let request = Request::new_with_str_and_init(url, &opts)?;
        let window = web_sys::window().ok_or(WheelError::MissingElement("window"))?;
        let value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| WheelError::Network(WheelError::from(e).to_string()))?;
        let response: Response = value
            .dyn_into()
            .map_err(|_| WheelError::Js("fetch did not return a Response".into()))?;
        let text = JsFuture::from(response.text()?).await?;
        Ok(HttpReply {
            status: response.status(),
            body: text.as_string().unwrap_or_default(),
        })
    }

    /// Body of a successful (2xx) response.
    pub async fn fetch_ok(url: &str) -> Result<String> {
        let reply = fetch_text(url).await?;
        if (200..300).contains(&reply.status) {
            Ok(reply.body)
        } else {
            Err(WheelError::Network(format!("HTTP {} for {url}", reply.status)))
        }
    }

    // Error replies (404/500) still carry the JSON envelope; the HTTP status
    // is only reported when the body is not JSON.
    pub async fn album_list(url: &str) -> Result<Vec<String>> {
        let reply = fetch_text(url).await?;
        super::parse_album_list(&reply.body).map_err(|err| match err {
            WheelError::Json(_) if !(200..300).contains(&reply.status) => {
                WheelError::Network(format!("HTTP {}", reply.status))
            }
            other => other,
        })
    }

    pub async fn album_load(url: &str) -> Result<super::AlbumDocument> {
        let reply = fetch_text(url).await?;
        super::parse_album_load(&reply.body).map_err(|err| match err {
            WheelError::Json(_) if !(200..300).contains(&reply.status) => {
                WheelError::Network(format!("HTTP {}", reply.status))
            }
            other => other,
        })
    }
}
