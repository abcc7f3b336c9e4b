//! Shareable output sinks

use std::fs::File;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// A cloneable handle to a single underlying writer
///
/// Clones write to the same sink, which is what lets the terminal-output
/// channel alias the error stream and the scoped log subscriber write
/// through the same tee as everything else.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SharedWriter {
    /// Wrap a writer
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Whether two handles point at the same sink
    pub fn same_sink(&self, other: &SharedWriter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A panic caught by the wrapper may have poisoned the lock; the
        // writer itself is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl std::fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedWriter").finish_non_exhaustive()
    }
}

/// The log file side of an error-stream tee
///
/// Closing is explicit so the file is released at a known point even if
/// clones of the tee are still around.
#[derive(Clone)]
pub struct LogFile {
    file: Arc<Mutex<Option<File>>>,
}

impl LogFile {
    /// Take ownership of an open log file
    pub fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(Some(file))),
        }
    }

    /// Flush and close the file; later writes are dropped
    pub fn close(&self) {
        let mut guard = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(mut file) = guard.take() {
            // Nothing useful can be reported here: the error stream is the
            // tee this file belongs to.
            let _ = file.flush();
        }
    }

    /// Whether the file is still open
    pub fn is_open(&self) -> bool {
        self.file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_mut() {
            Some(file) => file.write_all(buf),
            None => Ok(()),
        }
    }
}

/// Writes everything to a primary sink and copies it to a log file
///
/// The primary sink decides success; a failing log file never breaks the
/// error stream. Nothing in here may log through `tracing`, since the log
/// subscriber writes into this very tee.
pub struct Tee {
    primary: SharedWriter,
    log: LogFile,
}

impl Tee {
    /// Fan out writes to `primary` and `log`
    pub fn new(primary: SharedWriter, log: LogFile) -> Self {
        Self { primary, log }
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.primary.write_all(buf)?;
        let _ = self.log.write_all(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()
    }
}

/// An in-memory sink whose contents stay readable after it is handed out
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MemorySink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

#[cfg(test)]
impl MemorySink {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that refuses every write
#[cfg(test)]
pub(crate) struct BrokenSink;

#[cfg(test)]
impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_shared_writer_clones_share_sink() {
        let sink = MemorySink::default();
        let mut a = SharedWriter::new(sink.clone());
        let mut b = a.clone();
        a.write_all(b"one ").unwrap();
        b.write_all(b"two").unwrap();
        assert_eq!(sink.contents(), "one two");
        assert!(a.same_sink(&b));
        assert!(!a.same_sink(&SharedWriter::new(MemorySink::default())));
    }

    #[test]
    fn test_tee_copies_to_log_until_closed() {
        let sink = MemorySink::default();
        let mut log_file = tempfile::NamedTempFile::new().unwrap();
        let log = LogFile::new(log_file.reopen().unwrap());
        let mut tee = Tee::new(SharedWriter::new(sink.clone()), log.clone());

        tee.write_all(b"before\n").unwrap();
        log.close();
        assert!(!log.is_open());
        tee.write_all(b"after\n").unwrap();

        assert_eq!(sink.contents(), "before\nafter\n");
        let mut logged = String::new();
        log_file.read_to_string(&mut logged).unwrap();
        assert_eq!(logged, "before\n");
    }

    #[test]
    fn test_tee_fails_when_primary_fails() {
        let log = LogFile::new(tempfile::tempfile().unwrap());
        let mut tee = Tee::new(SharedWriter::new(BrokenSink), log);
        assert!(tee.write_all(b"x").is_err());
    }
}
