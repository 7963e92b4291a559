use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Failed to send message")]
    MissingMessageId,
    #[error("invalid gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("no data dir")]
    NoDataDir,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("No config dir")]
    NoConfigDir,
    #[error("invalid api url {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid phone number: please enter only numbers without any special characters")]
    InvalidPhoneNumber,
    #[error("message is empty")]
    EmptyMessage,
    #[error("no active chat")]
    NoActiveChat,
    #[error("instance id and api token are required")]
    MissingCredentials,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("a message is already being sent")]
    Busy,
}

/// Failures that end the terminal client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
