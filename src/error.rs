use thiserror::Error;

/// Everything that can go wrong while turning the schedule page into a calendar
#[derive(Debug, Error)]
pub enum Error {
    /// Neither the 12-hour nor the 24-hour format matched
    #[error("unrecognized time: {0:?}")]
    UnrecognizedTime(String),

    /// The schedule table isn't in the page, nothing can be recovered
    #[error("schedule table #{0} not found")]
    TableNotFound(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown timezone {name:?}: {reason}")]
    Timezone { name: String, reason: String },

    #[error("webdriver: {0}")]
    WebDriver(String),

    #[error(transparent)]
    Prompt(#[from] dialoguer::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
