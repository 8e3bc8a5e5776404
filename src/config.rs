use std::rc::Rc;

use crate::{
    command::CliCallback,
    convert::ConverterStore,
    errors::CallbackError,
    events::{Event, EventCallbacks, Scope},
    plugins,
};

/// How parameters declared as [`ParamKind::Auto`](crate::signature::ParamKind::Auto)
/// are exposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Classification {
    /// Required, non-boolean, non-object parameters of a command become
    /// positional arguments; everything else becomes an option. Nested
    /// groups only ever contain options.
    #[default]
    RequiredAsArguments,

    /// Everything that isn't variadic becomes an option.
    AllOptions,
}

/**
The per-invocation context: the event registry, the converter store, the
global eager callbacks and the classification policy. Build one per run and
pass it to [`build`](crate::builder::build) and
[`parse`](crate::dispatch::parse); nothing here is global.
*/
#[derive(Debug)]
pub struct Config {
    pub events: EventCallbacks,
    pub converters: ConverterStore,
    pub cli_callbacks: Vec<Rc<CliCallback>>,
    pub policy: Classification,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// A config with the standard eager callbacks: `--help`/`-h`,
    /// `--show-bindings` and the `--0` list separator.
    #[must_use]
    pub fn new() -> Self {
        let mut config = Self::bare();
        config.add_cli_callback(plugins::help::callback());
        config.add_cli_callback(plugins::bindings::callback());
        config.add_cli_callback(plugins::noop::callback());
        config
    }

    /// A config with no eager callbacks at all
    #[must_use]
    pub fn bare() -> Self {
        Self {
            events: EventCallbacks::new(),
            converters: ConverterStore::new(),
            cli_callbacks: Vec::new(),
            policy: Classification::default(),
        }
    }

    /// Add an eager callback to every command
    pub fn add_cli_callback(&mut self, callback: CliCallback) {
        self.cli_callbacks.push(Rc::new(callback));
    }

    /// Shorthand for `self.events.register::<E>(scope, callback)`
    pub fn on<E: Event>(
        &mut self,
        scope: Scope,
        callback: impl FnMut(&mut E::Payload) -> Result<(), CallbackError> + 'static,
    ) -> &mut Self {
        self.events.register::<E>(scope, callback);
        self
    }
}
