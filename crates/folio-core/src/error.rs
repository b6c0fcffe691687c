use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Invalid root margin: {0}")]
    RootMargin(String),

    #[error("Page description error: {0}")]
    Page(String),

    #[error("Controller '{name}' failed to start: {message}")]
    Controller { name: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
