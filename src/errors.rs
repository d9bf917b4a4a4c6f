use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("category key must not be empty")]
    EmptyCategory,
    #[error("invalid category key: {0:?}")]
    InvalidCategory(String),
}

#[derive(Debug, Error)]
pub enum DateError {
    #[error("invalid date {input:?}, expected YYYY-MM-DD")]
    Parse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("date {year:04}-{month:02}-{day:02} does not exist")]
    OutOfRange { year: i32, month: u32, day: u32 },
}

/// Failures at the boundary to the remote counter store.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid counter snapshot: {0}")]
    InvalidSnapshot(String),
}

impl TransportError {
    pub fn status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api url {0:?}")]
    InvalidUrl(String),
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("no categories configured")]
    NoCategories,
    #[error(transparent)]
    Category(#[from] ModelError),
}

/// Errors surfaced by the `portions` binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
    #[error("could not load {0}")]
    Unavailable(String),
}
