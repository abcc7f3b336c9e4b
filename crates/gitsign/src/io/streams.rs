//! The per-invocation stream bundle and its scoped execution wrapper

use super::terminal::{TerminalBinding, TerminalDevice};
use super::writer::{LogFile, SharedWriter, Tee};
use crate::error::{Error, Result};
use std::any::Any;
use std::cell::Cell;
use std::fs::File;
use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Once;
use std::thread;
use tracing_subscriber::EnvFilter;

/// Default log filter when none is configured
pub const DEFAULT_LOG_FILTER: &str = "warn";

thread_local! {
    /// Set while this thread runs a wrapped unit of work
    static INSIDE_WRAP: Cell<bool> = const { Cell::new(false) };
}

static PANIC_HOOK: Once = Once::new();

/// The input/output channels of one invocation
///
/// Standard streams are always present. The terminal channels and the log
/// tee only exist while [`Streams::wrap`] is running.
pub struct Streams {
    /// Message input (stdin)
    pub input: Box<dyn Read + Send>,
    /// Signature output (stdout)
    pub out: SharedWriter,
    /// Error stream (stderr), tee'd to the log file inside `wrap`
    pub err: SharedWriter,
    /// Terminal input, when a terminal is attached
    pub tty_in: Option<Box<dyn Read + Send>>,
    /// Terminal output, or an alias of `err` without a terminal
    pub tty_out: Option<SharedWriter>,
    /// File receiving a copy of the error stream
    pub log_path: Option<PathBuf>,
    terminal: TerminalDevice,
    log_filter: String,
}

/// The error stream as it was before the log tee was installed
struct LogAttachment {
    original: SharedWriter,
    file: LogFile,
}

impl Streams {
    /// Bundle the process's standard streams
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self::with_io(io::stdin(), io::stdout(), io::stderr(), log_path)
    }

    /// Bundle arbitrary streams
    pub fn with_io(
        input: impl Read + Send + 'static,
        out: impl Write + Send + 'static,
        err: impl Write + Send + 'static,
        log_path: Option<PathBuf>,
    ) -> Self {
        Self {
            input: Box::new(input),
            out: SharedWriter::new(out),
            err: SharedWriter::new(err),
            tty_in: None,
            tty_out: None,
            log_path,
            terminal: TerminalDevice::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Use a different terminal device
    pub fn with_terminal(mut self, terminal: TerminalDevice) -> Self {
        self.terminal = terminal;
        self
    }

    /// Set the `tracing` filter used while wrapped (e.g. `debug`)
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// The channel for operator-facing output
    pub fn terminal_output(&self) -> SharedWriter {
        self.tty_out.clone().unwrap_or_else(|| self.err.clone())
    }

    /// Terminal input, when a terminal is attached
    pub fn terminal_input(&mut self) -> Option<&mut (dyn Read + Send)> {
        let input: &mut (dyn Read + Send) = self.tty_in.as_mut()?.as_mut();
        Some(input)
    }

    /// The channel selected by a GPG-style `--status-fd`
    ///
    /// Descriptors 1 and 2 map onto the output and error streams; anything
    /// else goes to the terminal-output channel.
    pub fn status_output(&self, status_fd: Option<i32>) -> SharedWriter {
        match status_fd {
            Some(1) => self.out.clone(),
            Some(2) => self.err.clone(),
            _ => self.terminal_output(),
        }
    }

    /// Run `work` with logging and terminal channels set up
    ///
    /// Setup, in order: tee the error stream into the log file (if one is
    /// configured and can be created), then open the terminal or alias
    /// terminal output to the error stream. A returned error or a panic is
    /// written as one line to terminal output and returned. The terminal and
    /// then the log file are released on every path.
    pub fn wrap<F>(&mut self, work: F) -> Result<()>
    where
        F: FnOnce(&mut Streams) -> Result<()>,
    {
        let log = self.attach_log();
        let TerminalBinding {
            input,
            output,
            unavailable,
        } = TerminalBinding::resolve(self.terminal.open(), &self.err);
        self.tty_in = input;
        self.tty_out = Some(output);

        let outcome = {
            let _subscriber = tracing::subscriber::set_default(self.log_subscriber());
            // Both resources were acquired before the subscriber existed.
            if let (Err(err), Some(path)) = (&log, &self.log_path) {
                tracing::debug!("cannot open log file {}: {}", path.display(), err);
            }
            if let Some(err) = &unavailable {
                tracing::debug!("no terminal available ({}), using stderr", err);
            }
            tracing::debug!(
                terminal = unavailable.is_none(),
                log_file = matches!(log, Ok(Some(_))),
                "invocation streams ready"
            );

            contain_panics(|| work(self))
        };

        let result = outcome
            .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))));
        if let Err(err) = &result {
            self.report(err);
        }

        self.release_terminal();
        // Logging is best effort; a log that could not be opened has
        // nothing to release.
        if let Ok(Some(log)) = log {
            self.release_log(log);
        }
        result
    }

    fn attach_log(&mut self) -> io::Result<Option<LogAttachment>> {
        let Some(path) = self
            .log_path
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
        else {
            return Ok(None);
        };

        let file = LogFile::new(File::create(path)?);
        let original = self.err.clone();
        self.err = SharedWriter::new(Tee::new(original.clone(), file.clone()));
        Ok(Some(LogAttachment { original, file }))
    }

    fn release_terminal(&mut self) {
        self.tty_out = None;
        self.tty_in = None;
    }

    fn release_log(&mut self, log: LogAttachment) {
        self.err = log.original;
        log.file.close();
    }

    fn report(&self, err: &Error) {
        let mut out = self.terminal_output();
        // The terminal is the last place to report to; if it is gone there
        // is nowhere left.
        let _ = writeln!(out, "{}", err);
        let _ = out.flush();
    }

    fn log_subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let err = self.err.clone();
        let filter = EnvFilter::try_new(&self.log_filter)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(move || err.clone())
            .with_ansi(false)
            .with_target(false)
            .finish()
    }
}

/// Install, once per process, a panic hook that stays silent for panics
/// raised inside `wrap` and defers to the previous hook otherwise
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !INSIDE_WRAP.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// Run `work`, turning a panic into an `Err` without printing it
fn contain_panics<R>(work: impl FnOnce() -> R) -> thread::Result<R> {
    install_panic_hook();
    let outer = INSIDE_WRAP.with(|inside| inside.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(work));
    INSIDE_WRAP.with(|inside| inside.set(outer));
    outcome
}

/// Render a panic payload as a single line
fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    };
    message.lines().next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::writer::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixture {
        out: MemorySink,
        err: MemorySink,
        streams: Streams,
    }

    fn fixture(log_path: Option<PathBuf>, terminal: TerminalDevice) -> Fixture {
        let out = MemorySink::default();
        let err = MemorySink::default();
        let streams = Streams::with_io(io::empty(), out.clone(), err.clone(), log_path)
            .with_terminal(terminal);
        Fixture { out, err, streams }
    }

    #[test]
    fn test_log_file_receives_copy_of_error_stream() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("gitsign.log");
        let mut f = fixture(Some(log_path.clone()), TerminalDevice::Disabled);

        f.streams
            .wrap(|s| {
                writeln!(s.err, "first line").unwrap();
                writeln!(s.err, "second line").unwrap();
                Ok(())
            })
            .unwrap();

        assert_eq!(f.err.contents(), "first line\nsecond line\n");
        assert_eq!(
            std::fs::read_to_string(&log_path).unwrap(),
            "first line\nsecond line\n"
        );
    }

    #[test]
    fn test_log_tee_released_after_wrap() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("gitsign.log");
        let mut f = fixture(Some(log_path.clone()), TerminalDevice::Disabled);
        let original = f.streams.err.clone();

        f.streams.wrap(|s| {
            assert!(!s.err.same_sink(&original));
            Ok(())
        })
        .unwrap();

        assert!(f.streams.err.same_sink(&original));
        writeln!(f.streams.err, "after").unwrap();
        assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "");
    }

    #[test]
    fn test_unwritable_log_path_is_not_fatal() {
        let mut f = fixture(
            Some(PathBuf::from("/nonexistent/dir/gitsign.log")),
            TerminalDevice::Disabled,
        );
        let mut ran = false;
        f.streams
            .wrap(|s| {
                ran = true;
                writeln!(s.err, "still works").unwrap();
                Ok(())
            })
            .unwrap();
        assert!(ran);
        assert_eq!(f.err.contents(), "still works\n");
    }

    #[test]
    fn test_empty_log_path_means_no_logging() {
        let mut f = fixture(Some(PathBuf::new()), TerminalDevice::Disabled);
        let original = f.streams.err.clone();
        f.streams
            .wrap(|s| {
                assert!(s.err.same_sink(&original));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_without_terminal_output_goes_to_error_stream() {
        let mut f = fixture(None, TerminalDevice::Disabled);
        f.streams
            .wrap(|s| {
                assert!(s.tty_in.is_none());
                let mut tty = s.terminal_output();
                assert!(tty.same_sink(&s.err));
                writeln!(tty, "[GNUPG:] BEGIN_SIGNING").unwrap();
                Ok(())
            })
            .unwrap();
        assert_eq!(f.err.contents(), "[GNUPG:] BEGIN_SIGNING\n");
        assert!(f.out.contents().is_empty());
    }

    #[test]
    fn test_terminal_output_not_duplicated_to_error_stream() {
        let tty = tempfile::NamedTempFile::new().unwrap();
        let mut f = fixture(None, TerminalDevice::Path(tty.path().to_path_buf()));
        f.streams
            .wrap(|s| {
                assert!(s.tty_in.is_some());
                writeln!(s.terminal_output(), "Enter code: ABCD").unwrap();
                Ok(())
            })
            .unwrap();

        assert_eq!(std::fs::read_to_string(tty.path()).unwrap(), "Enter code: ABCD\n");
        assert!(f.err.contents().is_empty());
        assert!(f.streams.tty_in.is_none());
        assert!(f.streams.tty_out.is_none());
    }

    #[test]
    fn test_error_is_reported_once_and_returned() {
        let mut f = fixture(None, TerminalDevice::Disabled);
        let result = f
            .streams
            .wrap(|_| Err(Error::Verify("bad signature".to_string())));

        assert!(matches!(result, Err(Error::Verify(_))));
        assert_eq!(f.err.contents(), "failed to verify signature: bad signature\n");
    }

    #[test]
    fn test_error_reported_to_log_file_too() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("gitsign.log");
        let mut f = fixture(Some(log_path.clone()), TerminalDevice::Disabled);
        let _ = f.streams.wrap(|_| Err(Error::Config("broken".to_string())));

        assert_eq!(f.err.contents(), "configuration error: broken\n");
        assert_eq!(
            std::fs::read_to_string(&log_path).unwrap(),
            "configuration error: broken\n"
        );
    }

    #[test]
    fn test_panic_is_contained_and_surfaced() {
        let mut f = fixture(None, TerminalDevice::Disabled);
        let result = f.streams.wrap(|_| panic!("signer exploded\nwith detail"));

        match result {
            Err(Error::Panicked(message)) => assert_eq!(message, "signer exploded"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(f.err.contents(), "panic: signer exploded\n");
        assert!(f.streams.tty_out.is_none());
    }

    #[test]
    fn test_status_output_selection() {
        let f = fixture(None, TerminalDevice::Disabled);
        assert!(f.streams.status_output(Some(1)).same_sink(&f.streams.out));
        assert!(f.streams.status_output(Some(2)).same_sink(&f.streams.err));
        assert!(f.streams.status_output(None).same_sink(&f.streams.err));
    }

    #[test]
    fn test_debug_logs_are_tee_d_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("gitsign.log");
        let out = MemorySink::default();
        let err = MemorySink::default();
        let mut streams = Streams::with_io(io::empty(), out, err.clone(), Some(log_path.clone()))
            .with_terminal(TerminalDevice::Disabled)
            .with_log_filter("debug");

        streams
            .wrap(|_| {
                tracing::debug!("resolving identity");
                Ok(())
            })
            .unwrap();

        assert!(err.contents().contains("resolving identity"));
        assert!(std::fs::read_to_string(&log_path)
            .unwrap()
            .contains("resolving identity"));
    }

    #[test]
    fn test_log_open_failure_is_logged() {
        let err = MemorySink::default();
        let mut streams = Streams::with_io(
            io::empty(),
            MemorySink::default(),
            err.clone(),
            Some(PathBuf::from("/nonexistent/dir/gitsign.log")),
        )
        .with_terminal(TerminalDevice::Disabled)
        .with_log_filter("debug");

        streams.wrap(|_| Ok(())).unwrap();

        let contents = err.contents();
        assert!(contents.contains("cannot open log file /nonexistent/dir/gitsign.log"));
        assert!(contents.contains("no terminal available (terminal disabled), using stderr"));
    }

    #[test]
    fn test_concurrent_wraps_keep_outer_panic_hook() {
        const OUTSIDE: &str = "raised outside any wrap";

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().downcast_ref::<&str>() == Some(&OUTSIDE) {
                counter.fetch_add(1, Ordering::SeqCst);
            } else {
                previous(info);
            }
        }));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(|| {
                    for _ in 0..50 {
                        let mut f = fixture(None, TerminalDevice::Disabled);
                        let result = f.streams.wrap(|_| panic!("contained"));
                        assert!(matches!(result, Err(Error::Panicked(_))));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert!(thread::spawn(|| panic::panic_any(OUTSIDE)).join().is_err());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(!INSIDE_WRAP.with(Cell::get));
    }
}
