use thiserror::Error;

/// Failures talking to one of the analysis services.
/// The controller never surfaces these to the state; a failed call is an absent result.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error calling {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {endpoint} was cancelled")]
    Cancelled { endpoint: &'static str },
}

/// Why a suggestion could not be applied to host text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("suggestion {id} has no usable span and an empty original")]
    EmptyOriginal { id: String },

    #[error("original text {original:?} not found for suggestion {id}")]
    NotFound { id: String, original: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum EngieError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error("the engine must be started inside a tokio runtime")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, EngieError>;
