/*!
The `--help` eager callback, and the help renderer behind it. Defaults shown
are the effective ones, so config overrides appear as the displayed default.
*/

use std::fmt::{self, Display, Write as _};

use heck::{ToShoutySnakeCase as _, ToTitleCase as _};
use indent_write::fmt::IndentWriter;
use joinery::JoinableIterator;
use lazy_format::lazy_format;

use crate::{
    command::{CliCallback, CommandId, EagerContext, Flow},
    errors::CallbackError,
    group::{GroupId, ParameterGroup},
    overrides::DefaultTable,
    parameter::{Argument, Member, OptionParam, Parameter},
    tree::CommandTree,
    trigger::TriggerProcessor,
};

const WIDTH: usize = 80;
const COLUMN: usize = 26;

/// `--help` / `-h`: render help for the command being parsed and stop.
#[must_use]
pub fn callback() -> CliCallback {
    CliCallback::new(
        ["--help", "-h"],
        "Show this help message and exit",
        0,
        |context, _| {
            render(context)
                .map(Flow::Stop)
                .map_err(|_| CallbackError::new("failed to render help"))
        },
    )
}

pub fn render(context: &EagerContext<'_>) -> Result<String, fmt::Error> {
    let mut out = String::new();
    print_help(
        &mut out,
        context.tree,
        context.command,
        context.path,
        context.defaults,
    )?;
    Ok(out)
}

/*
Overall structure:

DESCRIPTION

Usage:
  program sub [OPTIONS] <ARG> [COMMAND]

Arguments:
  <ARG>

Options:
  -f, --foo <FOO>
      --help

Group:
  --group-bar <BAR>

Commands:
  sub
 */
pub fn print_help(
    out: &mut impl fmt::Write,
    tree: &CommandTree,
    id: CommandId,
    path: &[String],
    defaults: &DefaultTable,
) -> fmt::Result {
    let command = tree.command(id);
    let group = tree.group(command.group);
    let leaves = tree.leaves(id);

    if !command.doc.trim().is_empty() {
        writeln!(out, "{}", textwrap::fill(command.doc.trim(), WIDTH))?;
    }

    section(out, "Usage", |out| {
        write!(out, "{}", tree.display_path(path))?;

        if leaves.iter().any(|leaf| leaf.parameter.as_option().is_some()) {
            write!(out, " [OPTIONS]")?;
        }

        leaves
            .iter()
            .filter(|leaf| defaults.get(&leaf.dotted()).is_none())
            .filter_map(|leaf| Some((leaf, leaf.parameter.as_option()?)))
            .try_for_each(|(leaf, option)| {
                let trigger = leaf.display();
                let placeholder = option.name.to_shouty_snake_case();

                match option.is_flag() {
                    true => write!(out, " {trigger}"),
                    false => write!(out, " {trigger} <{placeholder}>"),
                }
            })?;

        leaves
            .iter()
            .filter_map(|leaf| Some((leaf, leaf.parameter.as_argument()?)))
            .try_for_each(|(leaf, argument)| {
                let optional = defaults.get(&leaf.dotted()).is_some();
                write!(out, " {}", argument_synopsis(argument, optional))
            })?;

        if !command.subcommands.is_empty() {
            write!(out, " [COMMAND]")?;
        }

        writeln!(out)
    })?;

    let arguments = group.members.iter().filter_map(|(name, member)| match member {
        Member::Parameter(Parameter::Argument(argument)) => Some((name, argument)),
        _ => None,
    });

    maybe_section(out, "Arguments", arguments, |out, (name, argument)| {
        let optional = defaults.get(name).is_some();
        let description = with_default(&argument.doc, defaults.get(name));
        describe(out, argument_synopsis(argument, optional), &description)
    })?;

    // Eager callbacks share the options section, after the parameters
    let options = group
        .members
        .iter()
        .filter_map(|(name, member)| match member {
            Member::Parameter(Parameter::Option(option)) => Some((
                option_item(group, option),
                with_default(&option.doc, defaults.get(name)),
            )),
            _ => None,
        })
        .chain(command.callbacks.iter().map(|callback| {
            let mut triggers: Vec<&str> = callback.triggers.iter().map(String::as_str).collect();
            triggers.sort_by_key(|trigger| trigger.starts_with("--"));

            let item = format!(
                "{}{}",
                triggers.iter().join_with(", "),
                " <VALUE>".repeat(callback.arity)
            );

            (item, callback.doc.clone())
        }));

    maybe_section(out, "Options", options, |out, (item, description)| {
        describe(out, item, &description)
    })?;

    print_nested_groups(out, tree, group, &[], defaults)?;

    maybe_section(out, "Commands", &command.subcommands, |out, (name, sub)| {
        describe(out, name, tree.command(*sub).summary())
    })
}

fn print_nested_groups(
    out: &mut (impl fmt::Write + ?Sized),
    tree: &CommandTree,
    group: &ParameterGroup,
    base: &[String],
    defaults: &DefaultTable,
) -> fmt::Result {
    group.members.iter().try_for_each(|(name, member)| match member {
        Member::Group(child) => print_group(out, tree, *child, &extend(base, name), defaults),
        Member::Parameter(_) => Ok(()),
    })
}

fn print_group(
    out: &mut (impl fmt::Write + ?Sized),
    tree: &CommandTree,
    id: GroupId,
    base: &[String],
    defaults: &DefaultTable,
) -> fmt::Result {
    let group = tree.group(id);
    let title = group.name.to_title_case();

    section(out, &title, |out| {
        let summary = group.doc.lines().next().unwrap_or("").trim();
        if !summary.is_empty() {
            writeln!(out, "{summary}")?;
        }

        group.members.iter().try_for_each(|(name, member)| match member {
            Member::Parameter(parameter) => {
                let path = extend(base, name).join(".");
                let description = with_default(parameter.doc(), defaults.get(&path));

                match parameter {
                    Parameter::Option(option) => {
                        describe(out, option_item(group, option), &description)
                    }
                    Parameter::Argument(argument) => {
                        let optional = defaults.get(&path).is_some();
                        describe(out, argument_synopsis(argument, optional), &description)
                    }
                }
            }
            Member::Group(_) => Ok(()),
        })?;

        // This is necessary to avoid an unbounded recursion of
        // nested writer types
        let out: &mut dyn fmt::Write = out;
        print_nested_groups(out, tree, group, base, defaults)
    })
}

fn extend(base: &[String], name: &str) -> Vec<String> {
    base.iter().cloned().chain([name.to_owned()]).collect()
}

fn with_default(doc: &str, default: Option<&crate::value::Value>) -> String {
    let doc = doc.trim();

    match default {
        None => doc.to_owned(),
        Some(value) if doc.is_empty() => format!("[default: {value}]"),
        Some(value) => format!("{doc} [default: {value}]"),
    }
}

fn argument_synopsis(argument: &Argument, optional: bool) -> impl Display + '_ {
    let placeholder = argument.name.as_str();

    lazy_format!(match ((optional, argument.variadic)) {
        (false, false) => "<{placeholder}>",
        (false, true) => "<{placeholder}>...",
        (true, false) => "[{placeholder}]",
        (true, true) => "[{placeholder}...]",
    })
}

/// Render one processor's triggers, shorts first, with a value placeholder
fn processor_item<'a>(
    group: &ParameterGroup,
    placeholder: &'a str,
    processor: &'a TriggerProcessor,
) -> Option<impl Display + 'a> {
    let mut triggers: Vec<String> = processor
        .triggers()
        .iter()
        .filter_map(|trigger| group.final_trigger(trigger))
        .collect();

    if triggers.is_empty() {
        return None;
    }

    triggers.sort_by_key(|trigger| trigger.starts_with("--"));
    let triggers = triggers.join(", ");

    Some(lazy_format!(match (processor) {
        TriggerProcessor::Constant { .. } => "{triggers}",
        TriggerProcessor::Convert { accumulate: false, .. } => "{triggers} <{placeholder}>",
        TriggerProcessor::Convert { accumulate: true, .. } => "{triggers} <{placeholder}> (repeatable)",
        TriggerProcessor::MultiConvert { .. } => "{triggers} <{placeholder}>...",
    }))
}

fn option_item(group: &ParameterGroup, option: &OptionParam) -> String {
    let placeholder = option.name.to_shouty_snake_case();

    option
        .processors
        .iter()
        .filter_map(|processor| processor_item(group, &placeholder, processor))
        .join_with(" / ")
        .to_string()
}

/// Write a section by writing a newline, then the `header`, then an
/// indented `body`.
fn section<O: fmt::Write + ?Sized, T>(
    out: &mut O,
    header: &str,
    body: impl FnOnce(&mut IndentWriter<&mut O>) -> Result<T, fmt::Error>,
) -> Result<T, fmt::Error> {
    writeln!(out, "\n{header}:")?;
    body(&mut IndentWriter::new("  ", out))
}

/// Write an optional section, only if the iterator is not empty.
/// Otherwise identical to `section`.
fn maybe_section<O: fmt::Write + ?Sized, I: IntoIterator>(
    out: &mut O,
    header: &str,
    items: I,
    mut body: impl FnMut(&mut IndentWriter<&mut O>, I::Item) -> fmt::Result,
) -> fmt::Result {
    let mut items = items.into_iter();

    match items.next() {
        None => Ok(()),
        Some(first) => section(out, header, |out| {
            body(out, first)?;
            items.try_for_each(|item| body(out, item))
        }),
    }
}

/// Describe an item by printing the item, followed by the description. If
/// the item is short enough, the description shares its line; otherwise it
/// is wrapped and indented below.
fn describe(out: &mut (impl fmt::Write + ?Sized), item: impl Display, description: &str) -> fmt::Result {
    let item = item.to_string();
    let description = description.trim();

    if description.is_empty() {
        writeln!(out, "{item}")
    } else if item.len() + 2 <= COLUMN
        && !description.contains('\n')
        && description.len() + COLUMN <= WIDTH
    {
        writeln!(out, "{item:<width$}{description}", width = COLUMN)
    } else {
        writeln!(out, "{item}")?;
        let mut out = IndentWriter::new("        ", out);
        writeln!(out, "{}", textwrap::fill(description, WIDTH - 10))
    }
}
