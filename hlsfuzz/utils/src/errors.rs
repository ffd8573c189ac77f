//! Errors generated by the generator and the code generator.
use thiserror::Error as ThisError;

/// Convience wrapper to represent success or meaningul generator error.
pub type FuzzResult<T> = std::result::Result<T, Error>;

/// The class of a generator error.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A graph-wide or per-node structural invariant does not hold.
    #[error("Malformed structure: {0}")]
    MalformedStructure(String),
    /// A caller supplied the wrong kind of node or a malformed descriptor.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The code generator has no mapping for a construct.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// Failed to write an artifact.
    #[error("Write error: {0}")]
    WriteError(String),
    /// Catch-all for everything else.
    #[error("{0}")]
    Misc(String),
}

/// Standard error type for hlsfuzz errors.
#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    kind: Box<ErrorKind>,
    /// Additional context printed after the main message.
    post_msg: Option<String>,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            post_msg: None,
        }
    }

    /// Attach a trailing message to the error.
    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }

    pub fn malformed_structure<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::MalformedStructure(msg.to_string()))
    }

    pub fn invalid_argument<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidArgument(msg.to_string()))
    }

    pub fn unsupported<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Unsupported(msg.to_string()))
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::WriteError(msg.to_string()))
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Misc(msg.to_string()))
    }

    /// The class this error belongs to.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if the error reports a broken structural invariant.
    pub fn is_structural(&self) -> bool {
        matches!(*self.kind, ErrorKind::MalformedStructure(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(post) = &self.post_msg {
            write!(f, "\n{post}")?;
        }
        Ok(())
    }
}

// Make `main` print the message instead of the derived struct layout.
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO Error: {e}"))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(_: std::fmt::Error) -> Self {
        Error::write_error("failed to format generated source")
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::write_error(format!("JSON Error: {e}"))
    }
}
