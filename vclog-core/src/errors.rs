use std::fmt;
use std::path::Path;
use std::path::PathBuf;

/// Common error cases surfaced by the storage engine.
///
/// The taxonomy deliberately distinguishes "absent" from "corrupt": a lookup
/// miss is [`RevlogError::UnknownRevision`] and is never folded into an
/// integrity failure, so callers cannot accidentally mask corruption as a
/// simple miss.
#[derive(Debug, derive_more::Display, derive_more::From)]
pub enum RevlogError {
    /// Lookup by node or revision number that does not exist.
    #[display("unknown revision: {_0}")]
    UnknownRevision(String),

    /// Reconstructed data does not hash to its recorded node, or the stored
    /// structure is self-inconsistent (bad base pointer, parent reference to
    /// a node not in the index, ...). Fatal for the current operation and
    /// any enclosing transaction.
    #[display("integrity check failed: {_0}")]
    Integrity(String),

    /// Malformed changegroup framing, an unsupported compression tag, or an
    /// empty changegroup where one was required.
    #[display("protocol violation: {_0}")]
    Protocol(String),

    /// A low-level IO error, with the operation it happened in.
    #[from]
    #[display("{_0}")]
    Io(IoError),
}

impl RevlogError {
    pub fn corrupted(context: impl AsRef<str>) -> Self {
        RevlogError::Integrity(format!(
            "corrupted revlog, {}",
            context.as_ref()
        ))
    }

    pub fn unknown_revision(id: impl fmt::Display) -> Self {
        RevlogError::UnknownRevision(id.to_string())
    }

    pub fn protocol(context: impl Into<String>) -> Self {
        RevlogError::Protocol(context.into())
    }
}

/// A stdlib IO error plus what the engine was doing at the time.
#[derive(Debug)]
pub struct IoError {
    pub error: std::io::Error,
    pub context: IoErrorContext,
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}

/// Details about where an I/O error happened.
#[derive(Debug)]
pub enum IoErrorContext {
    ReadingFile(PathBuf),
    WritingFile(PathBuf),
    TruncatingFile(PathBuf),
    /// Reading a changegroup stream
    ReadingStream,
    /// Writing a changegroup stream
    WritingStream,
}

impl fmt::Display for IoErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoErrorContext::ReadingFile(path) => {
                write!(f, "when reading {}", path.display())
            }
            IoErrorContext::WritingFile(path) => {
                write!(f, "when writing {}", path.display())
            }
            IoErrorContext::TruncatingFile(path) => {
                write!(f, "when truncating {}", path.display())
            }
            IoErrorContext::ReadingStream => {
                write!(f, "when reading changegroup stream")
            }
            IoErrorContext::WritingStream => {
                write!(f, "when writing changegroup stream")
            }
        }
    }
}

pub trait IoResultExt<T> {
    /// Annotate a possible I/O error as related to reading a file at the
    /// given path.
    ///
    /// This allows printing something like "File not found when reading
    /// 00changelog.i" instead of just "File not found".
    fn when_reading_file(self, path: impl AsRef<Path>)
        -> Result<T, RevlogError>;

    fn when_writing_file(self, path: impl AsRef<Path>)
        -> Result<T, RevlogError>;

    fn when_truncating_file(
        self,
        path: impl AsRef<Path>,
    ) -> Result<T, RevlogError>;

    fn with_context(
        self,
        context: impl FnOnce() -> IoErrorContext,
    ) -> Result<T, RevlogError>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn when_reading_file(
        self,
        path: impl AsRef<Path>,
    ) -> Result<T, RevlogError> {
        self.with_context(|| {
            IoErrorContext::ReadingFile(path.as_ref().to_owned())
        })
    }

    fn when_writing_file(
        self,
        path: impl AsRef<Path>,
    ) -> Result<T, RevlogError> {
        self.with_context(|| {
            IoErrorContext::WritingFile(path.as_ref().to_owned())
        })
    }

    fn when_truncating_file(
        self,
        path: impl AsRef<Path>,
    ) -> Result<T, RevlogError> {
        self.with_context(|| {
            IoErrorContext::TruncatingFile(path.as_ref().to_owned())
        })
    }

    fn with_context(
        self,
        context: impl FnOnce() -> IoErrorContext,
    ) -> Result<T, RevlogError> {
        self.map_err(|error| {
            RevlogError::Io(IoError { error, context: context() })
        })
    }
}

pub trait RevlogResultExt<T> {
    /// Handle missing files separately from other I/O error cases.
    ///
    /// * `Ok(x)` becomes `Ok(Some(x))`
    /// * An I/O "not found" error becomes `Ok(None)`
    /// * Other errors are unchanged
    fn io_not_found_as_none(self) -> Result<Option<T>, RevlogError>;
}

impl<T> RevlogResultExt<T> for Result<T, RevlogError> {
    fn io_not_found_as_none(self) -> Result<Option<T>, RevlogError> {
        match self {
            Ok(x) => Ok(Some(x)),
            Err(RevlogError::Io(io_error))
                if io_error.error.kind()
                    == std::io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(other_error) => Err(other_error),
        }
    }
}
