/*!
`--show-bindings`: list what each trigger and argument slot of the command
being parsed is bound to, then stop.
*/

use std::fmt::{self, Write as _};

use lazy_format::lazy_format;

use crate::{
    command::{CliCallback, EagerContext, Flow},
    convert::Converter,
    errors::CallbackError,
    table::TriggerTarget,
    trigger::TriggerProcessor,
};

pub const TRIGGER: &str = "--show-bindings";

#[must_use]
pub fn callback() -> CliCallback {
    CliCallback::new(
        [TRIGGER],
        "Show what each trigger is bound to and exit",
        0,
        |context, _| {
            render(context)
                .map(Flow::Stop)
                .map_err(|_| CallbackError::new("failed to render bindings"))
        },
    )
}

pub fn render(context: &EagerContext<'_>) -> Result<String, fmt::Error> {
    let command = context.tree.command(context.command);
    let leaves = context.tree.leaves(context.command);
    let mut out = String::new();

    writeln!(out, "{} ({})", context.tree.display_path(context.path), command.object_path)?;

    for leaf in &leaves {
        if let Some(argument) = leaf.parameter.as_argument() {
            let slot = match argument.variadic {
                true => format!("<{}>...", argument.name),
                false => format!("<{}>", argument.name),
            };
            writeln!(out, "  {slot:<24} {}", leaf.dotted())?;
        }
    }

    for (trigger, target) in command.triggers.bindings() {
        match target {
            TriggerTarget::Parameter { leaf, processor } => {
                let Some(leaf) = leaves.get(leaf) else {
                    continue;
                };
                let Some(processor) = leaf
                    .parameter
                    .as_option()
                    .and_then(|option| option.processors.get(processor))
                else {
                    continue;
                };

                let target = processor
                    .converter()
                    .map(Converter::target)
                    .unwrap_or_default();

                let action = lazy_format!(match (processor) {
                    TriggerProcessor::Constant { constant, .. } => "= {constant}",
                    TriggerProcessor::Convert { accumulate: false, .. } => "<- {target}",
                    TriggerProcessor::Convert { accumulate: true, .. } => "<- {target} (appends)",
                    TriggerProcessor::MultiConvert { .. } => "<- {target}...",
                });

                writeln!(out, "  {trigger:<24} {} {action}", leaf.dotted())?;
            }
            TriggerTarget::Callback(index) => {
                let doc = command
                    .callbacks
                    .get(index)
                    .map_or("", |callback| callback.doc.as_str());

                writeln!(out, "  {trigger:<24} callback: {doc}")?;
            }
        }
    }

    Ok(out)
}
