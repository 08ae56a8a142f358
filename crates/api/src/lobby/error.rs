use crate::store::JoinError;
use core::fmt::{self, Display};
use hyper::StatusCode;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    EmptyName,
    NameTaken,
    UnknownParticipant,
    UnknownQuestion,
    QuizInProgress,
    InvalidToken,
    /// The request body or a path parameter could not be parsed.
    Malformed,
    TooLarge,
    NotWebSocket,
    NotFound,
    Fatal,
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::Empty => Self::EmptyName,
            JoinError::Taken => Self::NameTaken,
        }
    }
}

impl Error {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::EmptyName | Self::Malformed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NameTaken => StatusCode::CONFLICT,
            Self::UnknownParticipant | Self::UnknownQuestion | Self::NotFound => StatusCode::NOT_FOUND,
            Self::QuizInProgress | Self::InvalidToken => StatusCode::FORBIDDEN,
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotWebSocket => StatusCode::BAD_REQUEST,
            Self::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => Display::fmt(&JoinError::Empty, f),
            Self::NameTaken => Display::fmt(&JoinError::Taken, f),
            Self::UnknownParticipant => f.write_str("Participant not found"),
            Self::UnknownQuestion => f.write_str("Question not found"),
            Self::QuizInProgress => f.write_str("Scoreboard is only available after the quiz finishes"),
            Self::InvalidToken => f.write_str("Invalid admin token"),
            Self::Malformed => f.write_str("Malformed request"),
            Self::TooLarge => f.write_str("Request body is too large"),
            Self::NotWebSocket => f.write_str("Expected a WebSocket upgrade"),
            Self::NotFound => f.write_str("Not Found"),
            Self::Fatal => f.write_str("Oops! We have encountered an unrecoverable error on our end."),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
