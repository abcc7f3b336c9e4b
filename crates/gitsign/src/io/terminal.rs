//! Interactive terminal access
//!
//! Git captures both stdout and stderr of the signing program, so anything
//! meant for the operator (device-flow prompts, progress) has to go to the
//! controlling terminal directly. CI runners and hooks usually have none, in
//! which case output falls back to the error stream.

use super::writer::SharedWriter;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Where to find the interactive terminal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TerminalDevice {
    /// The platform's controlling terminal (`/dev/tty`, `CONIN$`/`CONOUT$`)
    #[default]
    Platform,
    /// A specific device or file
    Path(PathBuf),
    /// Never use a terminal
    Disabled,
}

/// An open terminal: separate handles for reading and writing
#[derive(Debug)]
pub struct Terminal {
    /// Operator input
    pub input: File,
    /// Operator output
    pub output: File,
}

impl TerminalDevice {
    /// Try to open the terminal for reading and writing
    pub fn open(&self) -> io::Result<Terminal> {
        match self {
            TerminalDevice::Platform => open_platform(),
            TerminalDevice::Path(path) => open_path(path),
            TerminalDevice::Disabled => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "terminal disabled",
            )),
        }
    }
}

fn open_path(path: &Path) -> io::Result<Terminal> {
    let input = OpenOptions::new().read(true).write(true).open(path)?;
    let output = input.try_clone()?;
    Ok(Terminal { input, output })
}

#[cfg(unix)]
fn open_platform() -> io::Result<Terminal> {
    open_path(Path::new("/dev/tty"))
}

#[cfg(windows)]
fn open_platform() -> io::Result<Terminal> {
    let input = OpenOptions::new().read(true).write(true).open("CONIN$")?;
    let output = OpenOptions::new().read(true).write(true).open("CONOUT$")?;
    Ok(Terminal { input, output })
}

#[cfg(not(any(unix, windows)))]
fn open_platform() -> io::Result<Terminal> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "no terminal device on this platform",
    ))
}

/// The terminal channels to install for one invocation
pub struct TerminalBinding {
    /// Terminal input, if a terminal was opened
    pub input: Option<Box<dyn Read + Send>>,
    /// Terminal output: the terminal itself or the error stream
    pub output: SharedWriter,
    /// Why no terminal could be opened, when `output` is the error stream
    pub unavailable: Option<io::Error>,
}

impl TerminalBinding {
    /// Decide the terminal channels from the outcome of opening the device
    ///
    /// Without a terminal, output is aliased to `err` (which may already be
    /// the log tee) and there is no terminal input.
    pub fn resolve(opened: io::Result<Terminal>, err: &SharedWriter) -> Self {
        match opened {
            Ok(terminal) => TerminalBinding {
                input: Some(Box::new(terminal.input)),
                output: SharedWriter::new(terminal.output),
                unavailable: None,
            },
            Err(open_err) => TerminalBinding {
                input: None,
                output: err.clone(),
                unavailable: Some(open_err),
            },
        }
    }

    /// Whether `output` is a real terminal
    pub fn is_attached(&self) -> bool {
        self.unavailable.is_none()
    }
}
