//! Output destinations.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

use crate::config::STDOUT_DESTINATION;
use crate::error_handling::InitializationError;

/// Wrapper around a Write that ignores broken pipe errors (EPIPE).
/// This allows graceful handling when stdout is piped to a command that exits early.
pub(crate) struct IgnoreBrokenPipe<W: Write> {
    inner: W,
}

impl<W: Write> IgnoreBrokenPipe<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for IgnoreBrokenPipe<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).or_else(|e| {
            if e.kind() == ErrorKind::BrokenPipe {
                // Downstream closed the pipe
                Ok(buf.len())
            } else {
                Err(e)
            }
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().or_else(|e| {
            if e.kind() == ErrorKind::BrokenPipe {
                Ok(())
            } else {
                Err(e)
            }
        })
    }
}

/// Opens the record destination.
///
/// `-` is standard output. Any other path is created, or truncated if it
/// already exists.
///
/// # Errors
///
/// Returns `InitializationError::OutputFileError` if the file cannot be
/// created.
pub fn open_output(path: &Path) -> Result<Box<dyn Write + Send>, InitializationError> {
    if path == Path::new(STDOUT_DESTINATION) {
        return Ok(Box::new(IgnoreBrokenPipe::new(io::stdout())));
    }
    let file = File::create(path).map_err(|e| {
        InitializationError::OutputFileError(format!(
            "Failed to create output file {}: {e}",
            path.display()
        ))
    })?;
    Ok(Box::new(BufWriter::new(file)))
}
