use std::{fmt, rc::Rc};

use generational_arena::Index;

use crate::{
    errors::CallbackError,
    group::GroupId,
    overrides::DefaultTable,
    signature::Handler,
    table::TriggerTable,
    tree::CommandTree,
};

/// Handle to a [`Command`] stored in a [`CommandTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub(crate) Index);

/// What the scan should do after an eager callback runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,

    /// Abandon parsing; the string is shown to the user as the final output
    Stop(String),
}

/// Everything an eager callback can see about the command being parsed.
pub struct EagerContext<'a> {
    pub tree: &'a CommandTree,
    pub command: CommandId,

    /// Subcommand names from the root down to `command`
    pub path: &'a [String],

    /// Effective defaults for `command`, after config overrides
    pub defaults: &'a DefaultTable,
}

type EagerAction = Rc<dyn Fn(&EagerContext<'_>, &[&str]) -> Result<Flow, CallbackError>>;

/**
A CLI-level callback, such as `--help`. It runs as soon as one of its
triggers is seen, with exactly `arity` values, and may stop parsing.
*/
#[derive(Clone)]
pub struct CliCallback {
    pub triggers: Vec<String>,
    pub doc: String,
    pub arity: usize,
    action: EagerAction,
}

impl CliCallback {
    pub fn new(
        triggers: impl IntoIterator<Item = impl Into<String>>,
        doc: impl Into<String>,
        arity: usize,
        action: impl Fn(&EagerContext<'_>, &[&str]) -> Result<Flow, CallbackError> + 'static,
    ) -> Self {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            doc: doc.into(),
            arity,
            action: Rc::new(action),
        }
    }

    pub fn run(&self, context: &EagerContext<'_>, values: &[&str]) -> Result<Flow, CallbackError> {
        (self.action)(context, values)
    }
}

impl fmt::Debug for CliCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliCallback")
            .field("triggers", &self.triggers)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// One invocable node: its own parameter group, its subcommands, and the
/// handler to call once its arguments are resolved.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub object_path: String,
    pub doc: String,
    pub group: GroupId,
    pub subcommands: Vec<(String, CommandId)>,
    pub callbacks: Vec<Rc<CliCallback>>,
    pub handler: Option<Handler>,
    pub(crate) triggers: TriggerTable,
}

impl Command {
    pub fn add_callback(&mut self, callback: CliCallback) {
        self.callbacks.push(Rc::new(callback));
    }

    #[must_use]
    pub fn subcommand(&self, name: &str) -> Option<CommandId> {
        self.subcommands
            .iter()
            .find(|(key, _)| key == name)
            .map(|&(_, id)| id)
    }

    /// The first line of the doc string
    #[must_use]
    pub fn summary(&self) -> &str {
        self.doc.lines().next().unwrap_or("").trim()
    }

    /// Every trigger accepted by this command, as typed on the command line
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.triggers.names()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("object_path", &self.object_path)
            .field("group", &self.group)
            .field("subcommands", &self.subcommands)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}
