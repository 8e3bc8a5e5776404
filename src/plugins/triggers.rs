/*!
Rewriting option triggers after a group is assembled. A mapping sends a
trigger to a list of replacements: `--verbose => [--verbose, -v]` adds an
alias, `--colour => [--color]` renames, and `--debug => []` deletes.

Triggers are matched unprefixed, as declared on the group (`--arch`, not
`--model-arch`).
*/

use tracing::{debug, warn};

use crate::{
    config::Config,
    events::{PgPostCreate, Scope},
    group::ParameterGroup,
};

/// Trigger to replacement triggers, in order
pub type TriggerMap = Vec<(String, Vec<String>)>;

/// Build a [`TriggerMap`] from string literals
pub fn trigger_map<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a [&'a str])>,
) -> TriggerMap {
    entries
        .into_iter()
        .map(|(from, to)| {
            (
                from.to_owned(),
                to.iter().map(|&trigger| trigger.to_owned()).collect(),
            )
        })
        .collect()
}

/// Apply `mapping` to every option in `group`. Returns how many triggers
/// were rewritten.
pub fn map_triggers(group: &mut ParameterGroup, mapping: &TriggerMap) -> usize {
    let mut rewritten = 0;

    for option in group.options_mut() {
        for processor in &mut option.processors {
            let triggers = processor.triggers_mut();
            let mut mapped = Vec::with_capacity(triggers.len());

            for trigger in triggers.drain(..) {
                match mapping.iter().find(|(from, _)| *from == trigger) {
                    Some((_, replacements)) => {
                        debug!(%trigger, ?replacements, "mapping trigger");
                        rewritten += 1;
                        mapped.extend(
                            replacements
                                .iter()
                                .filter(|&replacement| !mapped.contains(replacement))
                                .cloned()
                                .collect::<Vec<_>>(),
                        );
                    }
                    None if !mapped.contains(&trigger) => mapped.push(trigger),
                    None => {}
                }
            }

            *triggers = mapped;
        }
    }

    rewritten
}

/// Register `mapping` to run on every group created for objects in `scope`.
pub fn register(config: &mut Config, scope: Scope, mapping: TriggerMap) {
    config.on::<PgPostCreate>(scope, move |group| {
        if map_triggers(group, &mapping) == 0 {
            warn!(group = %group.object_path, "trigger map matched nothing");
        }
        Ok(())
    });
}
