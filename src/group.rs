use generational_arena::Index;

use crate::parameter::{Member, OptionParam, Parameter};

/// Handle to a [`ParameterGroup`] stored in a
/// [`CommandTree`](crate::tree::CommandTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) Index);

/**
An ordered set of parameters and nested groups belonging to one command, or
to one object-typed parameter of a command.

Triggers stored on the options are unprefixed (`--arch`); the group's
`prefix` is applied when the command's trigger table is built, so nested
options appear as `--model-arch`. Short triggers don't survive prefixing.
*/
#[derive(Debug, Clone)]
pub struct ParameterGroup {
    /// The parameter name this group was built from, or the command name for
    /// a command's own group
    pub name: String,
    pub object_path: String,
    pub doc: String,
    pub prefix: Option<String>,
    pub members: Vec<(String, Member)>,
}

impl ParameterGroup {
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, member)| member)
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        match self.member(name)? {
            Member::Parameter(parameter) => Some(parameter),
            Member::Group(_) => None,
        }
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.members
            .iter_mut()
            .find(|(key, _)| key == name)
            .and_then(|(_, member)| match member {
                Member::Parameter(parameter) => Some(parameter),
                Member::Group(_) => None,
            })
    }

    pub fn option_mut(&mut self, name: &str) -> Option<&mut OptionParam> {
        match self.parameter_mut(name)? {
            Parameter::Option(option) => Some(option),
            Parameter::Argument(_) => None,
        }
    }

    pub fn options_mut(&mut self) -> impl Iterator<Item = &mut OptionParam> {
        self.members.iter_mut().filter_map(|(_, member)| match member {
            Member::Parameter(Parameter::Option(option)) => Some(option),
            _ => None,
        })
    }

    /// Append a parameter. Returns false (and changes nothing) if the name
    /// is taken.
    pub fn push(&mut self, parameter: Parameter) -> bool {
        let name = parameter.name().to_owned();

        match self.member(&name) {
            Some(_) => false,
            None => {
                self.members.push((name, Member::Parameter(parameter)));
                true
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Member> {
        let index = self.members.iter().position(|(key, _)| key == name)?;
        Some(self.members.remove(index).1)
    }

    /// Rename a member in place, keeping its position
    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> bool {
        let to = to.into();

        if self.member(&to).is_some() {
            return false;
        }

        match self.members.iter_mut().find(|(key, _)| key == from) {
            Some((key, member)) => {
                if let Member::Parameter(parameter) = member {
                    match parameter {
                        Parameter::Argument(argument) => argument.name = to.clone(),
                        Parameter::Option(option) => option.name = to.clone(),
                    }
                }
                *key = to;
                true
            }
            None => false,
        }
    }

    /// The trigger as it appears on the command line, once this group's
    /// prefix is applied. `None` for short triggers in prefixed groups.
    #[must_use]
    pub fn final_trigger(&self, trigger: &str) -> Option<String> {
        match (&self.prefix, trigger.strip_prefix("--")) {
            (None, _) => Some(trigger.to_owned()),
            (Some(prefix), Some(rest)) => Some(format!("--{prefix}-{rest}")),
            (Some(_), None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{convert::Converter, signature::ScalarKind, signature::TypeDescriptor};

    fn group(prefix: Option<&str>) -> ParameterGroup {
        ParameterGroup {
            name: "model".into(),
            object_path: "demo.Model".into(),
            doc: String::new(),
            prefix: prefix.map(Into::into),
            members: Vec::new(),
        }
    }

    fn option(name: &str) -> Parameter {
        Parameter::Option(OptionParam {
            name: name.into(),
            doc: String::new(),
            ty: TypeDescriptor::Scalar(ScalarKind::Str),
            default: None,
            processors: vec![crate::trigger::TriggerProcessor::Convert {
                triggers: vec![format!("--{name}")],
                converter: Converter::Scalar(ScalarKind::Str),
                accumulate: false,
            }],
        })
    }

    #[test]
    fn prefix_applies_to_long_triggers_only() {
        let nested = group(Some("model"));
        assert_eq!(nested.final_trigger("--arch").as_deref(), Some("--model-arch"));
        assert_eq!(nested.final_trigger("-a"), None);

        let top = group(None);
        assert_eq!(top.final_trigger("-a").as_deref(), Some("-a"));
    }

    #[test]
    fn push_rename_remove() {
        let mut group = group(None);
        assert!(group.push(option("arch")));
        assert!(!group.push(option("arch")));
        assert!(group.push(option("depth")));

        assert!(group.rename("arch", "architecture"));
        assert_eq!(
            group.parameter("architecture").map(Parameter::name),
            Some("architecture")
        );
        assert!(!group.rename("depth", "architecture"));

        assert!(group.remove("depth").is_some());
        assert_eq!(group.members.len(), 1);
    }
}
