//! Sub-operation dispatch
//!
//! Git selects the operation with GnuPG mode flags rather than a
//! subcommand, so handlers are registered by name and looked up from the
//! flag that was set.

pub mod sign;
pub mod verify;

pub use sign::SignCommand;
pub use verify::VerifyCommand;

use crate::backend::KeylessBackend;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::{BoxError, Error, Result};
use crate::io::Streams;
use std::collections::HashMap;

/// Everything a handler needs for one invocation
pub struct Options<'a> {
    pub cli: &'a Cli,
    pub config: &'a Config,
    pub streams: &'a mut Streams,
}

/// A sub-operation handler
pub trait Command {
    /// Run with the positional arguments from the command line
    fn run(&self, options: &mut Options<'_>, args: &[String]) -> Result<()>;
}

/// The operation a mode flag selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sign,
    Verify,
}

impl Mode {
    /// Registry name of the handler
    pub fn name(self) -> &'static str {
        match self {
            Mode::Sign => "sign",
            Mode::Verify => "verify",
        }
    }

    /// The mode selected by the flags, if any
    pub fn from_cli(cli: &Cli) -> Option<Mode> {
        if cli.sign {
            Some(Mode::Sign)
        } else if cli.verify {
            Some(Mode::Verify)
        } else {
            None
        }
    }
}

/// Handlers by name
#[derive(Default)]
pub struct Registry {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command` under `name`, replacing any previous handler
    pub fn register(&mut self, name: &'static str, command: impl Command + 'static) -> &mut Self {
        self.commands.insert(name, Box::new(command));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|command| command.as_ref())
    }
}

/// Run the handler selected by the mode flags
///
/// With no mode flag there is nothing to do. A selected mode without a
/// registered handler is an error.
pub fn dispatch(registry: &Registry, options: &mut Options<'_>, args: &[String]) -> Result<()> {
    let Some(mode) = Mode::from_cli(options.cli) else {
        tracing::debug!("no mode flag given, nothing to do");
        return Ok(());
    };

    let command = registry
        .get(mode.name())
        .ok_or(Error::UnregisteredCommand(mode.name()))?;
    tracing::debug!("dispatching to {}", mode.name());
    command.run(options, args)
}

/// Register the gitsign handlers and run the selected one
///
/// The backend is built only once a handler is about to run, so a backend
/// that fails to start is reported like any other failed operation.
pub fn execute<B, F>(options: &mut Options<'_>, args: &[String], backend: F) -> Result<()>
where
    B: KeylessBackend + 'static,
    F: FnOnce() -> std::result::Result<B, BoxError>,
{
    if Mode::from_cli(options.cli).is_none() {
        tracing::debug!("no mode flag given, nothing to do");
        return Ok(());
    }

    let mut registry = Registry::new();
    registry
        .register("sign", SignCommand::new(backend().map_err(Error::Backend)?))
        .register("verify", VerifyCommand::new());
    dispatch(&registry, options, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FakeBackend;
    use crate::io::writer::MemorySink;
    use crate::io::TerminalDevice;
    use clap::Parser;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        calls: Rc<RefCell<Vec<(&'static str, Vec<String>)>>>,
    }

    impl Command for Recorder {
        fn run(&self, options: &mut Options<'_>, args: &[String]) -> Result<()> {
            self.calls.borrow_mut().push((self.name, args.to_vec()));
            writeln!(options.streams.out, "ran {}", self.name).map_err(Error::WriteSignature)
        }
    }

    struct Failing;

    impl Command for Failing {
        fn run(&self, _options: &mut Options<'_>, _args: &[String]) -> Result<()> {
            Err(Error::Verify("no signature found".to_string()))
        }
    }

    fn run(registry: &Registry, argv: &[&str]) -> (Result<()>, String) {
        let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
        let config = Config::default();
        let out = MemorySink::default();
        let mut streams = Streams::with_io(std::io::empty(), out.clone(), MemorySink::default(), None);
        let mut options = Options {
            cli: &cli,
            config: &config,
            streams: &mut streams,
        };
        let result = dispatch(registry, &mut options, &cli.args);
        (result, out.contents())
    }

    fn recording_registry() -> (Registry, Rc<RefCell<Vec<(&'static str, Vec<String>)>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();
        registry
            .register(
                "sign",
                Recorder {
                    name: "sign",
                    calls: calls.clone(),
                },
            )
            .register(
                "verify",
                Recorder {
                    name: "verify",
                    calls: calls.clone(),
                },
            );
        (registry, calls)
    }

    #[test]
    fn test_sign_flag_selects_sign() {
        let (registry, calls) = recording_registry();
        let (result, out) = run(&registry, &["gitsign", "-bsau", "KEY", "commit.txt"]);

        result.unwrap();
        assert_eq!(out, "ran sign\n");
        assert_eq!(*calls.borrow(), vec![("sign", vec!["commit.txt".to_string()])]);
    }

    #[test]
    fn test_verify_flag_selects_verify() {
        let (registry, calls) = recording_registry();
        let (result, _) = run(&registry, &["gitsign", "--verify", "sig", "-"]);

        result.unwrap();
        assert_eq!(
            *calls.borrow(),
            vec![("verify", vec!["sig".to_string(), "-".to_string()])]
        );
    }

    #[test]
    fn test_no_mode_is_a_no_op() {
        let (registry, calls) = recording_registry();
        let (result, out) = run(&registry, &["gitsign", "stray-arg"]);

        result.unwrap();
        assert!(out.is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_unregistered_command() {
        let registry = Registry::new();
        let (result, _) = run(&registry, &["gitsign", "--verify"]);
        assert!(matches!(result, Err(Error::UnregisteredCommand("verify"))));
    }

    #[test]
    fn test_handler_error_is_forwarded() {
        let mut registry = Registry::new();
        registry.register("verify", Failing);
        let (result, _) = run(&registry, &["gitsign", "--verify"]);
        assert!(matches!(result, Err(Error::Verify(_))));
    }

    #[test]
    fn test_backend_failure_is_reported_once() {
        let cli = Cli::try_parse_from(["gitsign", "-bsau", "KEY"]).unwrap();
        let config = Config::default();
        let err = MemorySink::default();
        let mut streams = Streams::with_io(std::io::empty(), MemorySink::default(), err.clone(), None)
            .with_terminal(TerminalDevice::Disabled);

        let result = streams.wrap(|streams| {
            let mut options = Options {
                cli: &cli,
                config: &config,
                streams,
            };
            execute(&mut options, &cli.args, || {
                Err::<FakeBackend, BoxError>("no async runtime".into())
            })
        });

        assert!(matches!(result, Err(Error::Backend(_))));
        assert_eq!(
            err.contents(),
            "failed to start signing backend: no async runtime\n"
        );
    }

    #[test]
    fn test_backend_not_built_without_mode() {
        let cli = Cli::try_parse_from(["gitsign"]).unwrap();
        let config = Config::default();
        let mut streams = Streams::with_io(std::io::empty(), MemorySink::default(), MemorySink::default(), None);
        let mut options = Options {
            cli: &cli,
            config: &config,
            streams: &mut streams,
        };

        let result = execute(&mut options, &cli.args, || -> std::result::Result<FakeBackend, BoxError> {
            panic!("backend built without a mode flag")
        });
        assert!(result.is_ok());
    }
}
