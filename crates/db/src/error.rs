use core::fmt::{self, Display};
use serde_json::error::Category;

#[derive(Debug)]
pub enum Error {
    /// The file we are trying to read does not exist.
    NotFound,
    /// Contents were parsed but violate a catalog invariant.
    BadInput,
    /// JSON syntax error detected.
    Syntax,
    /// Unexpected JSON data types encountered.
    Data,
    /// Unrecoverable I/O error.
    Fatal,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Fatal
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Syntax | Category::Eof => Self::Syntax,
            Category::Data => Self::Data,
            Category::Io => Self::Fatal,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "File not found.",
            Self::BadInput => "Quiz catalog violates a structural constraint.",
            Self::Syntax => "Syntax error in JSON detected.",
            Self::Data => "Unexpected data types in JSON detected.",
            Self::Fatal => "We encountered an unexpected I/O error on our end.",
        })
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
