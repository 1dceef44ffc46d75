//! Error types for the game core and its hosts

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Sound output failed: {0}")]
    Sound(String),

    #[error("Unknown landmark/segmentation source '{0}'")]
    UnknownSource(String),

    #[error("Recording export failed: {0}")]
    Recording(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn render<S: Into<String>>(msg: S) -> Self {
        Self::Render(msg.into())
    }

    pub fn sound<S: Into<String>>(msg: S) -> Self {
        Self::Sound(msg.into())
    }

    pub fn recording<S: Into<String>>(msg: S) -> Self {
        Self::Recording(msg.into())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<Error> for wasm_bindgen::JsValue {
    fn from(err: Error) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}

/// Describe a thrown JS value for logs and error variants
#[cfg(target_arch = "wasm32")]
pub fn describe_js(value: &wasm_bindgen::JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(value, &wasm_bindgen::JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{value:?}"))
}
