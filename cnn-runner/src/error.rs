use std::fmt;
use std::io;
use std::path::PathBuf;

/// Host-side errors: data files and kernel rejection.
#[derive(Debug)]
pub enum Error {
    /// Data file does not exist
    Missing(PathBuf),
    /// I/O failure while reading or writing a data file
    Io(PathBuf, io::Error),
    /// Data file exists but holds the wrong number of bytes
    Incomplete {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
    /// The kernel rejected the requested run
    Kernel(cnn_stream::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Missing(path) => write!(f, "cannot find {}", path.display()),
            Error::Io(path, e) => write!(f, "{}: {e}", path.display()),
            Error::Incomplete {
                path,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "incomplete {}: {actual} bytes, expected {expected}",
                    path.display()
                )
            }
            Error::Kernel(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<cnn_stream::Error> for Error {
    fn from(e: cnn_stream::Error) -> Self {
        Error::Kernel(e)
    }
}
