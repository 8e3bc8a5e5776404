/*!
The per-command trigger table: every final trigger (prefixes applied) mapped
to the option processor or eager callback it fires. All trigger validation
happens here, at build time.
*/

use generational_arena::Arena;
use itertools::Itertools;

use crate::{
    command::Command,
    errors::BuildError,
    group::ParameterGroup,
    parameter::Parameter,
    tree::collect_leaves,
    trigger::TriggerProcessor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TriggerTarget {
    /// A processor of the option at `leaf` (an index into the command's
    /// flattened leaves)
    Parameter { leaf: usize, processor: usize },

    /// One of the command's eager callbacks
    Callback(usize),
}

#[derive(Debug, Clone)]
struct Entry {
    trigger: String,
    target: TriggerTarget,
    owner: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TriggerTable {
    entries: Vec<Entry>,
}

#[derive(Debug)]
pub(crate) enum Resolution<'a> {
    Found {
        trigger: &'a str,
        target: TriggerTarget,
    },
    Ambiguous(Vec<String>),
    Unknown,
}

fn valid_trigger(trigger: &str) -> bool {
    match trigger.strip_prefix("--") {
        Some(long) => {
            !long.is_empty()
                && !long.starts_with('-')
                && !long.contains(|c: char| c == '=' || c.is_whitespace())
        }
        None => match trigger.strip_prefix('-') {
            Some(short) => {
                let mut chars = short.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if c != '-' && !c.is_whitespace())
            }
            None => false,
        },
    }
}

impl TriggerTable {
    pub(crate) fn build(
        groups: &Arena<ParameterGroup>,
        command: &Command,
    ) -> Result<Self, BuildError> {
        let mut leaves = Vec::new();
        collect_leaves(groups, command.group, &[], &mut leaves);

        let mut table = TriggerTable::default();

        for (index, leaf) in leaves.iter().enumerate() {
            let Parameter::Option(option) = leaf.parameter else {
                continue;
            };

            let owner = leaf.dotted();

            let repeats = option.processors.iter().any(|processor| {
                matches!(
                    processor,
                    TriggerProcessor::Convert {
                        accumulate: true,
                        ..
                    }
                )
            });
            let runs = option
                .processors
                .iter()
                .any(|processor| matches!(processor, TriggerProcessor::MultiConvert { .. }));

            if repeats && runs {
                return Err(BuildError::MixedListMechanisms { path: owner });
            }

            let mut count = 0;

            for (position, processor) in option.processors.iter().enumerate() {
                for trigger in processor.triggers() {
                    if !valid_trigger(trigger) {
                        return Err(BuildError::InvalidTrigger {
                            trigger: trigger.clone(),
                            owner,
                        });
                    }

                    if let Some(trigger) = leaf.group.final_trigger(trigger) {
                        let target = TriggerTarget::Parameter {
                            leaf: index,
                            processor: position,
                        };
                        table.insert(trigger, target, &owner)?;
                        count += 1;
                    }
                }
            }

            if count == 0 {
                return Err(BuildError::NoTriggers { path: owner });
            }
        }

        for (index, callback) in command.callbacks.iter().enumerate() {
            let owner = match callback.triggers.first() {
                Some(trigger) => format!("callback {trigger}"),
                None => {
                    return Err(BuildError::NoTriggers {
                        path: format!("callback #{index} of {}", command.object_path),
                    });
                }
            };

            for trigger in &callback.triggers {
                if !valid_trigger(trigger) {
                    return Err(BuildError::InvalidTrigger {
                        trigger: trigger.clone(),
                        owner,
                    });
                }

                table.insert(trigger.clone(), TriggerTarget::Callback(index), &owner)?;
            }
        }

        Ok(table)
    }

    fn insert(&mut self, trigger: String, target: TriggerTarget, owner: &str) -> Result<(), BuildError> {
        match self.entries.iter().find(|entry| entry.trigger == trigger) {
            Some(existing) => Err(BuildError::DuplicateTrigger {
                trigger,
                first: existing.owner.clone(),
                second: owner.to_owned(),
            }),
            None => {
                self.entries.push(Entry {
                    trigger,
                    target,
                    owner: owner.to_owned(),
                });
                Ok(())
            }
        }
    }

    /// Look up a token such as `--model-arch` or `-v`. An exact match always
    /// wins; otherwise a long token may be an unambiguous prefix of a long
    /// trigger. Prefixes that only reach aliases of the same target are not
    /// ambiguous.
    pub(crate) fn resolve(&self, token: &str) -> Resolution<'_> {
        if let Some(entry) = self.entries.iter().find(|entry| entry.trigger == token) {
            return Resolution::Found {
                trigger: &entry.trigger,
                target: entry.target,
            };
        }

        if token.len() <= 2 || !token.starts_with("--") {
            return Resolution::Unknown;
        }

        let candidates: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|entry| entry.trigger.starts_with("--") && entry.trigger.starts_with(token))
            .collect();

        let Some(&first) = candidates.first() else {
            return Resolution::Unknown;
        };

        match candidates.iter().map(|entry| entry.target).all_equal() {
            true => Resolution::Found {
                trigger: &first.trigger,
                target: first.target,
            },
            false => Resolution::Ambiguous(
                candidates
                    .iter()
                    .map(|entry| entry.trigger.clone())
                    .collect(),
            ),
        }
    }

    /// True if a token should end a variable-length run: any long-looking
    /// token, or a short whose first letter is a known trigger.
    pub(crate) fn terminates_run(&self, token: &str) -> bool {
        if token.starts_with("--") {
            return true;
        }

        match token.strip_prefix('-').and_then(|rest| rest.chars().next()) {
            Some(short) => {
                let short = format!("-{short}");
                self.entries.iter().any(|entry| entry.trigger == short)
            }
            None => false,
        }
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.trigger.as_str())
    }

    /// Every trigger with its target, in registration order
    pub(crate) fn bindings(&self) -> impl Iterator<Item = (&str, TriggerTarget)> {
        self.entries
            .iter()
            .map(|entry| (entry.trigger.as_str(), entry.target))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("--model-arch", true)]
    #[case("--0", true)]
    #[case("-v", true)]
    #[case("--", false)]
    #[case("---x", false)]
    #[case("--a=b", false)]
    #[case("-vv", false)]
    #[case("verbose", false)]
    #[case("--two words", false)]
    fn trigger_shapes(#[case] trigger: &str, #[case] valid: bool) {
        assert_eq!(valid_trigger(trigger), valid);
    }

    fn table(triggers: &[(&str, TriggerTarget)]) -> TriggerTable {
        let mut table = TriggerTable::default();
        for &(trigger, target) in triggers {
            table.insert(trigger.to_owned(), target, trigger).unwrap();
        }
        table
    }

    fn param(leaf: usize) -> TriggerTarget {
        TriggerTarget::Parameter { leaf, processor: 0 }
    }

    #[test]
    fn exact_beats_prefix() {
        let table = table(&[("--model", param(0)), ("--model-arch", param(1))]);

        assert!(matches!(
            table.resolve("--model"),
            Resolution::Found { trigger: "--model", .. }
        ));
    }

    #[test]
    fn ambiguous_prefixes_list_candidates() {
        let table = table(&[("--model-arch", param(0)), ("--model-adapter", param(1))]);

        match table.resolve("--model-a") {
            Resolution::Ambiguous(candidates) => {
                assert_eq!(candidates, ["--model-arch", "--model-adapter"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }

        assert!(matches!(
            table.resolve("--model-ar"),
            Resolution::Found { trigger: "--model-arch", .. }
        ));
    }

    #[test]
    fn aliases_of_one_target_are_not_ambiguous() {
        let table = table(&[("--learning-rate", param(0)), ("--lr", param(0))]);

        assert!(matches!(
            table.resolve("--l"),
            Resolution::Found { target, .. } if target == param(0)
        ));
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut table = table(&[("--x", param(0))]);
        let error = table.insert("--x".into(), param(1), "other").unwrap_err();

        assert!(matches!(error, BuildError::DuplicateTrigger { .. }));
    }

    #[test]
    fn runs_end_at_known_shorts_and_any_long() {
        let table = table(&[("-v", param(0))]);

        assert!(table.terminates_run("--anything"));
        assert!(table.terminates_run("-v"));
        assert!(!table.terminates_run("-5"));
        assert!(!table.terminates_run("-"));
        assert!(!table.terminates_run("value"));
    }
}
