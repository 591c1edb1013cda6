//! Error types shared by the library and the executables.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dimacs::ParseError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("ERROR! Could not open file: {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ERROR! Could not run {}: {source}", program.display())]
    Run {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Malformed vtree or SDD file.
    #[error("{}line {line}: {message}", file_prefix(.path))]
    Format {
        path: Option<PathBuf>,
        line: usize,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Error::Format {
            path: None,
            line,
            message: message.into(),
        }
    }

    /// Attaches the file a format error came from.
    pub(crate) fn in_file(self, file: &Path) -> Self {
        match self {
            Error::Format {
                path: None,
                line,
                message,
            } => Error::Format {
                path: Some(file.to_path_buf()),
                line,
                message,
            },
            other => other,
        }
    }
}

fn file_prefix(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!("{}: ", path.display()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Opens `path` for reading, naming the path on failure.
pub fn open(path: impl Into<PathBuf>) -> Result<std::fs::File> {
    let path = path.into();
    std::fs::File::open(&path).map_err(|source| Error::Open { path, source })
}

/// Creates (truncating) `path` for writing, naming the path on failure.
pub fn create(path: impl Into<PathBuf>) -> Result<std::fs::File> {
    let path = path.into();
    std::fs::File::create(&path).map_err(|source| Error::Open { path, source })
}
