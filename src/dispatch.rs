/*!
The tokenizer/dispatcher: scans a flat token stream against a built
[`CommandTree`], binding values to each command on the way down the
subcommand chain.

Conversion, missing, ambiguous and unknown-token problems are collected so
that a single pass reports as many independent errors as possible. Callback
failures abort immediately.
*/

use ignite_parser::{Arg, ArgAccess, ArgumentsParser, Visitor};
use tracing::{debug, instrument, trace, warn};

use crate::{
    command::{Command, CommandId, EagerContext, Flow},
    config::Config,
    errors::{CallbackError, Error, MissingKind, ParseError, ParseErrors},
    events::{BoundCommand, CmdPostProcess, Slot, StartArgs, StartArgsPreProcess},
    overrides::{DefaultTable, apply_overrides},
    parameter::Parameter,
    table::{Resolution, TriggerTarget},
    tree::{CommandTree, Leaf},
    trigger::{Arity, ProcessError},
    value::{CallArgs, Value},
};

/// The resolved arguments for one command in the chain
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandId,

    /// Subcommand names from the root down to `command`
    pub path: Vec<String>,
    pub args: CallArgs,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// Every command in the chain, root first
    Complete(Vec<Invocation>),

    /// A callback stopped the run. `remaining` holds the tokens that were
    /// never looked at.
    Stopped {
        output: String,
        remaining: Vec<String>,
    },
}

/// Parse `tokens` (excluding the program name) against `tree`.
#[instrument(level = "debug", skip_all, fields(tokens = tokens.len()))]
pub fn parse<S: AsRef<str>>(
    config: &mut Config,
    tree: &CommandTree,
    tokens: &[S],
) -> Result<Outcome, Error> {
    let root = tree.command(tree.root());

    let mut start = StartArgs::new(
        root.name.as_str(),
        root.object_path.as_str(),
        tokens.iter().map(|token| token.as_ref().to_owned()).collect(),
    );
    config.events.fire::<StartArgsPreProcess>(&mut start)?;

    if start.tokens.len() != tokens.len() {
        match start.tokens.is_empty() {
            true => warn!(given = tokens.len(), "start callbacks discarded every token"),
            false => debug!(given = tokens.len(), now = start.tokens.len(), "tokens rewritten"),
        }
    }

    if let Some(output) = start.take_stop() {
        debug!("stopped before parsing");
        return Ok(Outcome::Stopped {
            output,
            remaining: start.tokens,
        });
    }

    let StartArgs {
        tokens, overrides, ..
    } = start;

    let mut parser = ArgumentsParser::new(tokens.iter().map(String::as_str));
    let mut errors = Vec::new();
    let mut invocations = Vec::new();
    let mut current = tree.root();
    let mut path: Vec<String> = Vec::new();

    loop {
        let command = tree.command(current);
        let declared = DefaultTable::declared(tree, current);

        let defaults = match apply_overrides(&declared, &overrides.scoped(&path)) {
            Ok(effective) => effective,
            Err(override_errors) => {
                errors.extend(override_errors);
                declared
            }
        };

        let mut state = CommandState::new(tree, current, &defaults);

        let next = loop {
            let scan = Scan {
                state: &mut state,
                path: &path,
            };

            match parser.next_arg(scan) {
                None => break None,
                Some(Step::Continue) => {}
                Some(Step::Enter(id, name)) => break Some((id, name)),
                Some(Step::Stop(output)) => {
                    debug!(command = %command.name, "stopped by callback");
                    return Ok(Outcome::Stopped {
                        output,
                        remaining: parser.into_remaining(),
                    });
                }
                Some(Step::Fail(error)) => return Err(error.into()),
            }
        };

        let CommandState {
            slots,
            errors: scan_errors,
            ..
        } = state;
        errors.extend(scan_errors);

        let mut bound = BoundCommand {
            name: command.name.clone(),
            object_path: command.object_path.clone(),
            path: path.clone(),
            slots: slots
                .iter()
                .map(|slot| Slot {
                    path: slot.leaf.path.clone(),
                    value: slot.value.clone(),
                    default: defaults.get(&slot.dotted).cloned(),
                })
                .collect(),
        };
        config.events.fire::<CmdPostProcess>(&mut bound)?;

        let mut args = CallArgs::new();

        for (slot, scanned) in bound.slots.iter().zip(&slots) {
            match slot.resolved() {
                Some(value) => args.insert_path(&slot.path, value.clone()),
                None if scanned.failed => {}
                None => errors.push(ParseError::Missing {
                    command: tree.display_path(&path),
                    parameter: scanned.leaf.display(),
                    kind: match scanned.leaf.parameter {
                        Parameter::Argument(_) => MissingKind::Argument,
                        Parameter::Option(_) => MissingKind::Option,
                    },
                }),
            }
        }

        invocations.push(Invocation {
            command: current,
            path: path.clone(),
            args,
        });

        match next {
            Some((id, name)) => {
                debug!(subcommand = %name, "entering subcommand");
                current = id;
                path.push(name);
            }
            None => break,
        }
    }

    match ParseErrors::new(errors) {
        Some(errors) => Err(errors.into()),
        None => Ok(Outcome::Complete(invocations)),
    }
}

/// What the scan loop should do after one token
enum Step {
    Continue,
    Enter(CommandId, String),
    Stop(String),
    Fail(CallbackError),
}

/// How many values a trigger wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Demand {
    Exactly(usize),
    Run,
}

struct SlotState<'t> {
    leaf: Leaf<'t>,
    dotted: String,
    value: Option<Value>,

    /// An argument slot has received its token(s)
    touched: bool,

    /// A conversion failed; don't also report it as missing
    failed: bool,
}

struct CommandState<'t> {
    tree: &'t CommandTree,
    id: CommandId,
    command: &'t Command,
    defaults: &'t DefaultTable,
    slots: Vec<SlotState<'t>>,

    /// The variadic argument currently collecting positionals
    open_run: Option<usize>,
    errors: Vec<ParseError>,
}

impl<'t> CommandState<'t> {
    fn new(tree: &'t CommandTree, id: CommandId, defaults: &'t DefaultTable) -> Self {
        let slots = tree
            .leaves(id)
            .into_iter()
            .map(|leaf| SlotState {
                dotted: leaf.dotted(),
                leaf,
                value: None,
                touched: false,
                failed: false,
            })
            .collect();

        Self {
            tree,
            id,
            command: tree.command(id),
            defaults,
            slots,
            open_run: None,
            errors: Vec::new(),
        }
    }

    fn lookup(&mut self, token: &str) -> Option<(&'t str, TriggerTarget)> {
        let command: &'t Command = self.command;

        match command.triggers.resolve(token) {
            Resolution::Found { trigger, target } => Some((trigger, target)),
            Resolution::Ambiguous(candidates) => {
                self.errors.push(ParseError::AmbiguousOption {
                    token: token.to_owned(),
                    candidates,
                });
                None
            }
            Resolution::Unknown => {
                self.errors.push(ParseError::UnknownToken {
                    token: token.to_owned(),
                });
                None
            }
        }
    }

    fn demand(&self, target: TriggerTarget) -> Demand {
        match target {
            TriggerTarget::Parameter { leaf, processor } => {
                let arity = self.slots[leaf]
                    .leaf
                    .parameter
                    .as_option()
                    .and_then(|option| option.processors.get(processor))
                    .map(|processor| processor.arity());

                match arity {
                    Some(Arity::Exactly(count)) => Demand::Exactly(count),
                    Some(Arity::Run) => Demand::Run,
                    Some(Arity::Zero) | None => Demand::Exactly(0),
                }
            }
            TriggerTarget::Callback(index) => Demand::Exactly(self.command.callbacks[index].arity),
        }
    }

    fn next_unfilled_argument(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.leaf.parameter.as_argument().is_some() && !slot.touched)
    }

    /// Every parameter has a value, either from the command line or from a
    /// default.
    fn required_satisfied(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| slot.value.is_some() || self.defaults.get(&slot.dotted).is_some())
    }

    fn positional(&mut self, raw: &str) -> Step {
        if let Some(index) = self.open_run {
            self.push_run(index, raw);
            return Step::Continue;
        }

        let next = self.next_unfilled_argument();

        if let Some(subcommand) = self.command.subcommand(raw) {
            if next.is_none() || self.required_satisfied() {
                return Step::Enter(subcommand, raw.to_owned());
            }
        }

        match next {
            Some(index) => self.bind(index, raw),
            None => self.errors.push(ParseError::UnknownToken {
                token: raw.to_owned(),
            }),
        }

        Step::Continue
    }

    /// Give a positional token to an argument slot
    fn bind(&mut self, index: usize, raw: &str) {
        let slot = &mut self.slots[index];
        let Some(argument) = slot.leaf.parameter.as_argument() else {
            return;
        };

        trace!(argument = %argument.name, raw, "positional");
        slot.touched = true;

        match argument.converter.convert(raw) {
            Ok(value) => {
                slot.value = Some(match argument.variadic {
                    true => Value::List(Vec::from([value])),
                    false => value,
                })
            }
            Err(message) => {
                slot.failed = true;
                self.errors.push(ParseError::Conversion {
                    parameter: slot.leaf.display(),
                    raw: raw.to_owned(),
                    target: argument.converter.target(),
                    message,
                });
            }
        }

        if argument.variadic {
            self.open_run = Some(index);
        }
    }

    /// Add a positional token to an open variadic run
    fn push_run(&mut self, index: usize, raw: &str) {
        let slot = &mut self.slots[index];
        let Some(argument) = slot.leaf.parameter.as_argument() else {
            return;
        };

        match argument.converter.convert(raw) {
            Ok(value) => match &mut slot.value {
                Some(Value::List(values)) => values.push(value),
                other => *other = Some(Value::List(Vec::from([value]))),
            },
            Err(message) => {
                slot.failed = true;
                self.errors.push(ParseError::Conversion {
                    parameter: slot.leaf.display(),
                    raw: raw.to_owned(),
                    target: argument.converter.target(),
                    message,
                });
            }
        }
    }

    /// Run an option's processor on the gathered values
    fn apply(&mut self, leaf: usize, processor: usize, trigger: &str, values: &[&str]) {
        let slot = &mut self.slots[leaf];
        let Some(processor) = slot
            .leaf
            .parameter
            .as_option()
            .and_then(|option| option.processors.get(processor))
        else {
            return;
        };

        trace!(trigger, ?values, "option");

        match processor.apply(slot.value.as_ref(), values) {
            Ok(applied) => {
                slot.value = Some(applied.value);
                slot.touched = true;
            }
            Err(ProcessError::Conversion {
                raw,
                target,
                message,
            }) => {
                slot.failed = true;
                self.errors.push(ParseError::Conversion {
                    parameter: trigger.to_owned(),
                    raw,
                    target,
                    message,
                });
            }
            Err(ProcessError::Repeated) => self.errors.push(ParseError::DuplicateOption {
                parameter: slot.dotted.clone(),
                trigger: trigger.to_owned(),
            }),
            Err(ProcessError::MissingValue) => self.errors.push(ParseError::MissingValue {
                trigger: trigger.to_owned(),
            }),
        }
    }
}

/// The visitor handed to the parser for a single token
struct Scan<'s, 't> {
    state: &'s mut CommandState<'t>,
    path: &'s [String],
}

impl Scan<'_, '_> {
    fn option<'arg>(self, token: &str, access: impl ArgAccess<'arg>) -> Step {
        self.state.open_run = None;

        let Some((trigger, target)) = self.state.lookup(token) else {
            return Step::Continue;
        };

        let values: Vec<&'arg str> = match self.state.demand(target) {
            Demand::Exactly(0) => Vec::new(),
            // A value never swallows a token that would itself fire an option;
            // `--x=--y` is the way to pass such a value.
            Demand::Exactly(count) => {
                let table = &self.state.command.triggers;
                let mut left = count;
                let taken = access.take_while(|arg| match left {
                    0 => false,
                    _ if table.terminates_run(arg.as_str()) => false,
                    _ => {
                        left -= 1;
                        true
                    }
                });

                if taken.len() < count {
                    self.state.errors.push(ParseError::MissingValue {
                        trigger: trigger.to_owned(),
                    });
                    return Step::Continue;
                }

                taken.into_iter().map(Arg::as_str).collect()
            }
            Demand::Run => {
                let table = &self.state.command.triggers;
                access
                    .take_while(|arg| !table.terminates_run(arg.as_str()))
                    .into_iter()
                    .map(Arg::as_str)
                    .collect()
            }
        };

        self.fire(trigger, target, &values)
    }

    fn fire(self, trigger: &str, target: TriggerTarget, values: &[&str]) -> Step {
        match target {
            TriggerTarget::Parameter { leaf, processor } => {
                self.state.apply(leaf, processor, trigger, values);
                Step::Continue
            }
            TriggerTarget::Callback(index) => {
                let state = &*self.state;
                let context = EagerContext {
                    tree: state.tree,
                    command: state.id,
                    path: self.path,
                    defaults: state.defaults,
                };

                debug!(trigger, "eager callback");

                match state.command.callbacks[index].run(&context, values) {
                    Ok(Flow::Continue) => Step::Continue,
                    Ok(Flow::Stop(output)) => Step::Stop(output),
                    Err(error) => Step::Fail(error),
                }
            }
        }
    }
}

impl<'arg> Visitor<'arg> for Scan<'_, '_> {
    type Value = Step;

    fn visit_positional(self, argument: &'arg Arg) -> Step {
        self.state.positional(argument.as_str())
    }

    fn visit_long_option(self, option: &'arg Arg, argument: &'arg Arg) -> Step {
        self.state.open_run = None;

        let token = format!("--{option}");
        let Some((trigger, target)) = self.state.lookup(&token) else {
            return Step::Continue;
        };

        if self.state.demand(target) == Demand::Exactly(0) {
            self.state.errors.push(ParseError::UnexpectedValue {
                trigger: trigger.to_owned(),
                value: argument.as_str().to_owned(),
            });
            return Step::Continue;
        }

        if let Demand::Exactly(count @ 2..) = self.state.demand(target) {
            self.state.errors.push(ParseError::MissingValue {
                trigger: format!("{trigger} (needs {count} values)"),
            });
            return Step::Continue;
        }

        self.fire(trigger, target, &[argument.as_str()])
    }

    fn visit_long(self, option: &'arg Arg, arg: impl ArgAccess<'arg>) -> Step {
        let token = format!("--{option}");
        self.option(&token, arg)
    }

    fn visit_short(self, option: char, arg: impl ArgAccess<'arg>) -> Step {
        let token = format!("-{option}");
        self.option(&token, arg)
    }
}
