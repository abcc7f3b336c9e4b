//! Input/output plumbing for one invocation
//!
//! - [`Streams`]: stdin/stdout/stderr plus the terminal and log file
//! - [`TerminalDevice`]: where the interactive terminal lives
//! - [`SharedWriter`], [`Tee`]: cloneable sinks and the log tee

mod streams;
pub mod terminal;
pub mod writer;

pub use streams::{Streams, DEFAULT_LOG_FILTER};
pub use terminal::{TerminalBinding, TerminalDevice};
pub use writer::{LogFile, SharedWriter, Tee};
