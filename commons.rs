// Types shared by every stage of the crate.

use std::path::PathBuf;

use thiserror::Error;

/// A value that passed validation.  Only the validating functions construct
/// this, so holding one is proof that the check ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Valid<T>(pub T);

impl<T> Valid<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Valid<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

// Skip validation.  Only tests and trusted in-crate producers should use this.
pub fn skip_validation<T>(x: T) -> Valid<T> {
    Valid(x)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing input facts for `{relation}` (expected {})", path.display())]
    MissingFacts { relation: String, path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed fact in `{relation}` at line {line}: {message}")]
    MalformedFact {
        relation: String,
        line: usize,
        message: String,
    },

    #[error("invalid facts in `{relation}`: {message}")]
    InvalidFacts { relation: String, message: String },

    #[error("relation `{relation}` depends negatively on its own recursive group")]
    Unstratifiable { relation: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
