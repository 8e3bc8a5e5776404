/*!
The built parameter model. Groups and commands live in arenas and refer to
each other through [`GroupId`] and [`CommandId`] handles, so the tree can be
walked without recursive ownership.
*/

use generational_arena::Arena;
use itertools::Itertools;

use crate::{
    command::{Command, CommandId},
    group::{GroupId, ParameterGroup},
    parameter::{Member, Parameter},
};

#[derive(Debug)]
pub struct CommandTree {
    pub(crate) groups: Arena<ParameterGroup>,
    pub(crate) commands: Arena<Command>,
    pub(crate) root: CommandId,
}

/// A parameter reached by walking a command's group and its nested groups
#[derive(Debug, Clone)]
pub struct Leaf<'a> {
    /// Parameter names from the command's own group down to this parameter
    pub path: Vec<String>,

    /// The group that directly owns the parameter
    pub group: &'a ParameterGroup,
    pub parameter: &'a Parameter,
}

impl Leaf<'_> {
    /// The dotted path, such as `model.arch`
    #[must_use]
    pub fn dotted(&self) -> String {
        self.path.iter().join(".")
    }

    /// How the parameter is referred to in messages: `<name>` for
    /// arguments, the first trigger for options.
    #[must_use]
    pub fn display(&self) -> String {
        match self.parameter {
            Parameter::Argument(argument) => format!("<{}>", argument.name),
            Parameter::Option(option) => option
                .triggers()
                .find_map(|trigger| self.group.final_trigger(trigger))
                .unwrap_or_else(|| self.dotted()),
        }
    }
}

pub(crate) fn collect_leaves<'a>(
    groups: &'a Arena<ParameterGroup>,
    group: GroupId,
    base: &[String],
    out: &mut Vec<Leaf<'a>>,
) {
    let owner = &groups[group.0];

    for (name, member) in &owner.members {
        let path: Vec<String> = base.iter().cloned().chain([name.clone()]).collect();

        match member {
            Member::Parameter(parameter) => out.push(Leaf {
                path,
                group: owner,
                parameter,
            }),
            Member::Group(child) => collect_leaves(groups, *child, &path, out),
        }
    }
}

impl CommandTree {
    #[inline]
    #[must_use]
    pub fn root(&self) -> CommandId {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn command(&self, id: CommandId) -> &Command {
        &self.commands[id.0]
    }

    #[inline]
    #[must_use]
    pub fn group(&self, id: GroupId) -> &ParameterGroup {
        &self.groups[id.0]
    }

    #[must_use]
    pub fn subcommand(&self, id: CommandId, name: &str) -> Option<CommandId> {
        self.command(id).subcommand(name)
    }

    /// Follow a chain of subcommand names from the root
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<CommandId> {
        path.iter()
            .try_fold(self.root, |id, name| self.subcommand(id, name))
    }

    /// Every parameter of a command, in declaration order, with nested groups
    /// flattened.
    #[must_use]
    pub fn leaves(&self, id: CommandId) -> Vec<Leaf<'_>> {
        let mut leaves = Vec::new();
        collect_leaves(&self.groups, self.command(id).group, &[], &mut leaves);
        leaves
    }

    /// The root name followed by the subcommand path, for messages
    #[must_use]
    pub fn display_path(&self, path: &[String]) -> String {
        let root = &self.command(self.root).name;

        match path.is_empty() {
            true => root.clone(),
            false => format!("{root} {}", path.iter().join(" ")),
        }
    }
}
