/*!
Turns an [`ObjSignature`] into a [`CommandTree`], firing the construction
events along the way:

1. `SIG_EXTRACT` with the signature (and again with each nested object's
   signature) before it's interpreted
2. `PG_POST_CREATE` with each assembled parameter group
3. `CMD_POST_CREATE` with each command, before its triggers are validated
4. subcommands from the methods of the returned object, recursively

The first error aborts the whole build; a partial tree is never returned.
*/

use generational_arena::Arena;
use heck::ToKebabCase as _;
use tracing::{debug, instrument, trace};

use crate::{
    command::{Command, CommandId},
    config::{Classification, Config},
    convert::Converter,
    errors::BuildError,
    events::{CmdPostCreate, PgPostCreate, SigExtract},
    group::{GroupId, ParameterGroup},
    parameter::{Argument, Member, OptionParam, Parameter},
    signature::{ObjSignature, ParamKind, ParameterSignature, ScalarKind, TypeDescriptor},
    table::TriggerTable,
    tree::CommandTree,
    trigger::TriggerProcessor,
    value::Value,
};

/// Build the command tree for `signature`, with `name` as the root command's
/// name.
#[instrument(level = "debug", skip(config, signature), fields(object = %signature.name))]
pub fn build(
    config: &mut Config,
    name: &str,
    signature: &ObjSignature,
) -> Result<CommandTree, BuildError> {
    let mut builder = TreeBuilder {
        config,
        groups: Arena::new(),
        commands: Arena::new(),
    };

    let root = builder.command(name.to_owned(), signature)?;

    Ok(CommandTree {
        groups: builder.groups,
        commands: builder.commands,
        root,
    })
}

/// The name a subcommand gets from its method's object path
#[must_use]
pub fn subcommand_name(signature: &ObjSignature) -> String {
    signature.short_name().to_kebab_case()
}

/// Where a group sits, while it's being built
struct Frame<'a> {
    name: &'a str,
    prefix: Option<String>,
    path: Vec<String>,
    top_level: bool,
}

impl Frame<'_> {
    fn child_path(&self, name: &str) -> Vec<String> {
        self.path
            .iter()
            .cloned()
            .chain([name.to_owned()])
            .collect()
    }
}

enum Class {
    Argument,
    Option,
    Group,
}

struct TreeBuilder<'c> {
    config: &'c mut Config,
    groups: Arena<ParameterGroup>,
    commands: Arena<Command>,
}

impl TreeBuilder<'_> {
    fn command(&mut self, name: String, signature: &ObjSignature) -> Result<CommandId, BuildError> {
        let mut signature = signature.clone();
        self.config.events.fire::<SigExtract>(&mut signature)?;

        debug!(command = %name, object = %signature.name, "building command");

        let group = self.group(
            &signature,
            Frame {
                name: &name,
                prefix: None,
                path: Vec::new(),
                top_level: true,
            },
        )?;

        let mut command = Command {
            name,
            object_path: signature.name.clone(),
            doc: signature.doc.clone(),
            group,
            subcommands: Vec::new(),
            callbacks: self.config.cli_callbacks.clone(),
            handler: signature.handler.clone(),
            triggers: TriggerTable::default(),
        };

        self.config.events.fire::<CmdPostCreate>(&mut command)?;
        command.triggers = TriggerTable::build(&self.groups, &command)?;

        if let TypeDescriptor::Object(instance) = &signature.returns {
            for method in &instance.methods {
                let subcommand = subcommand_name(method);

                if command.subcommand(&subcommand).is_some() {
                    return Err(BuildError::DuplicateSubcommand {
                        command: command.object_path.clone(),
                        name: subcommand,
                    });
                }

                let id = self.command(subcommand.clone(), method)?;
                command.subcommands.push((subcommand, id));
            }
        }

        Ok(CommandId(self.commands.insert(command)))
    }

    fn group(&mut self, signature: &ObjSignature, frame: Frame<'_>) -> Result<GroupId, BuildError> {
        let mut group = ParameterGroup {
            name: frame.name.to_owned(),
            object_path: signature.name.clone(),
            doc: signature.doc.clone(),
            prefix: frame.prefix.clone(),
            members: Vec::with_capacity(signature.params.len()),
        };

        for param in &signature.params {
            let path = frame.child_path(&param.name);

            if group.member(&param.name).is_some() {
                return Err(BuildError::DuplicateParameter {
                    path: path.join("."),
                });
            }

            let member = match classify(param, frame.top_level, self.config.policy, &path)? {
                Class::Group => Member::Group(self.nested_group(param, &frame, path)?),
                Class::Argument => Member::Parameter(self.argument(param, &path)?),
                Class::Option => Member::Parameter(self.option(param, &path)?),
            };

            trace!(parameter = %param.name, "classified");
            group.members.push((param.name.clone(), member));
        }

        self.config.events.fire::<PgPostCreate>(&mut group)?;

        Ok(GroupId(self.groups.insert(group)))
    }

    fn nested_group(
        &mut self,
        param: &ParameterSignature,
        frame: &Frame<'_>,
        path: Vec<String>,
    ) -> Result<GroupId, BuildError> {
        let Some(nested) = param.ty.as_object() else {
            return Err(BuildError::Unclassifiable {
                path: path.join("."),
                reason: "not an object type".to_owned(),
            });
        };

        let mut nested = ObjSignature::clone(nested);
        self.config.events.fire::<SigExtract>(&mut nested)?;

        if !param.doc.is_empty() {
            nested.doc = param.doc.clone();
        }

        let segment = param.name.to_kebab_case();
        let prefix = match &frame.prefix {
            Some(prefix) => format!("{prefix}-{segment}"),
            None => segment,
        };

        self.group(
            &nested,
            Frame {
                name: &param.name,
                prefix: Some(prefix),
                path,
                top_level: false,
            },
        )
    }

    fn argument(&self, param: &ParameterSignature, path: &[String]) -> Result<Parameter, BuildError> {
        let (element, variadic) = match param.ty.unwrap_optional() {
            TypeDescriptor::Sequence(inner) => (&**inner, true),
            other if param.variadic => (other, true),
            _ => (&param.ty, false),
        };

        let converter = self.config.converters.resolve(element).ok_or_else(|| {
            BuildError::NoConverter {
                path: path.join("."),
                type_name: element.type_name(),
            }
        })?;

        let default = match (&param.default, variadic) {
            (Some(default), _) => Some(default.clone()),
            (None, true) if param.variadic => Some(Value::List(Vec::new())),
            (None, _) if param.ty.is_optional() => Some(Value::None),
            (None, _) => None,
        };

        Ok(Parameter::Argument(Argument {
            name: param.name.clone(),
            doc: param.doc.clone(),
            ty: param.ty.clone(),
            converter,
            default,
            variadic,
        }))
    }

    fn option(&self, param: &ParameterSignature, path: &[String]) -> Result<Parameter, BuildError> {
        let long = param.name.to_kebab_case();

        let mut triggers = Vec::from([format!("--{long}")]);
        triggers.extend(param.short.map(|short| format!("-{short}")));

        let processors = match param.ty.unwrap_optional() {
            TypeDescriptor::Scalar(ScalarKind::Bool) => Vec::from([
                TriggerProcessor::Constant {
                    triggers,
                    constant: Value::Bool(true),
                },
                TriggerProcessor::Constant {
                    triggers: Vec::from([format!("--no-{long}")]),
                    constant: Value::Bool(false),
                },
            ]),
            TypeDescriptor::Sequence(inner) => Vec::from([TriggerProcessor::Convert {
                triggers,
                converter: self.converter(inner, path)?,
                accumulate: true,
            }]),
            _ => Vec::from([TriggerProcessor::Convert {
                triggers,
                converter: self.converter(&param.ty, path)?,
                accumulate: false,
            }]),
        };

        let default = match &param.default {
            Some(default) => Some(default.clone()),
            None if param.ty.is_optional() => Some(Value::None),
            None => None,
        };

        Ok(Parameter::Option(OptionParam {
            name: param.name.clone(),
            doc: param.doc.clone(),
            ty: param.ty.clone(),
            default,
            processors,
        }))
    }

    fn converter(
        &self,
        ty: &TypeDescriptor,
        path: &[String],
    ) -> Result<Converter, BuildError> {
        self.config
            .converters
            .resolve(ty)
            .ok_or_else(|| BuildError::NoConverter {
                path: path.join("."),
                type_name: ty.type_name(),
            })
    }
}

fn classify(
    param: &ParameterSignature,
    top_level: bool,
    policy: Classification,
    path: &[String],
) -> Result<Class, BuildError> {
    let unclassifiable = |reason: &str| BuildError::Unclassifiable {
        path: path.join("."),
        reason: reason.to_owned(),
    };

    let ty = param.ty.unwrap_optional();

    if matches!(ty, TypeDescriptor::Unit) {
        return Err(unclassifiable("parameters can't have the unit type"));
    }

    if ty.as_object().is_some() {
        return match (param.variadic, param.kind) {
            (true, _) => Err(unclassifiable("variadic parameters can't be objects")),
            (false, ParamKind::Argument) => {
                Err(unclassifiable("objects can't be positional arguments"))
            }
            (false, ParamKind::Auto | ParamKind::Option) => Ok(Class::Group),
        };
    }

    if let TypeDescriptor::Sequence(inner) = ty {
        if matches!(
            inner.unwrap_optional(),
            TypeDescriptor::Object(_) | TypeDescriptor::Sequence(_)
        ) {
            return Err(unclassifiable("only lists of scalars are supported"));
        }
    }

    if spans_tokens(ty) {
        return match (param.variadic, param.kind) {
            (true, _) | (false, ParamKind::Argument) => {
                Err(unclassifiable("tuples can't be positional arguments"))
            }
            (false, ParamKind::Auto | ParamKind::Option) => Ok(Class::Option),
        };
    }

    if param.variadic {
        return Ok(Class::Argument);
    }

    Ok(match param.kind {
        ParamKind::Argument => Class::Argument,
        ParamKind::Option => Class::Option,
        ParamKind::Auto => match policy {
            Classification::RequiredAsArguments
                if top_level && param.is_required() && !param.ty.is_bool() =>
            {
                Class::Argument
            }
            _ => Class::Option,
        },
    })
}

/// Values of this type take more than one token, so they can only follow a
/// trigger.
fn spans_tokens(ty: &TypeDescriptor) -> bool {
    match ty.unwrap_optional() {
        TypeDescriptor::Tuple(_) => true,
        TypeDescriptor::Union(members) => members.iter().any(spans_tokens),
        TypeDescriptor::Sequence(inner) => spans_tokens(inner),
        _ => false,
    }
}
