use taskdeck_client::ClientError;
use taskdeck_core::config::ConfigError;
use taskdeck_core::{ApiError, RouteError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("form has {0} invalid field(s)")]
    InvalidForm(usize),

    #[error("a confirmation is pending; answer yes or no first")]
    DialogOpen,

    #[error("nothing is waiting for confirmation")]
    NothingPending,

    #[error("{0}")]
    Unavailable(&'static str),

    #[error("no task selected; pass an id")]
    NoTaskSelected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
