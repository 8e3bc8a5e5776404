/*!
The leaves of the parameter model: positional [`Argument`]s and triggered
[`OptionParam`]s.
*/

use crate::{
    convert::Converter,
    group::GroupId,
    signature::TypeDescriptor,
    trigger::TriggerProcessor,
    value::Value,
};

/// A positional parameter. Consumes one token, or a contiguous run of tokens
/// when `variadic`.
#[derive(Debug, Clone)]
pub struct Argument {
    pub name: String,
    pub doc: String,
    pub ty: TypeDescriptor,

    /// Converter for a single token (each element, for variadic arguments)
    pub converter: Converter,
    pub default: Option<Value>,
    pub variadic: bool,
}

/// A parameter set through one or more triggers (`--name`, `-n`).
#[derive(Debug, Clone)]
pub struct OptionParam {
    pub name: String,
    pub doc: String,
    pub ty: TypeDescriptor,
    pub default: Option<Value>,
    pub processors: Vec<TriggerProcessor>,
}

impl OptionParam {
    /// Every trigger of every processor, unprefixed
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.processors
            .iter()
            .flat_map(|processor| processor.triggers())
            .map(String::as_str)
    }

    /// Switch from list-by-repetition (`--x 1 --x 2`) to list-from-one-run
    /// (`--x 1 2`). Returns false if the option doesn't build a list by
    /// repetition.
    pub fn make_multi_value(&mut self) -> bool {
        let mut changed = false;

        for processor in &mut self.processors {
            if let TriggerProcessor::Convert {
                triggers,
                converter,
                accumulate: true,
            } = processor
            {
                *processor = TriggerProcessor::MultiConvert {
                    triggers: std::mem::take(triggers),
                    converter: converter.clone(),
                };
                changed = true;
            }
        }

        changed
    }

    /// Add a trigger that sets this option to an empty list, such as
    /// `--tags-empty`.
    pub fn add_empty_trigger(&mut self, trigger: impl Into<String>) {
        self.processors.push(TriggerProcessor::Constant {
            triggers: Vec::from([trigger.into()]),
            constant: Value::List(Vec::new()),
        });
    }

    /// True if the only processors are constants (a plain flag)
    #[must_use]
    pub fn is_flag(&self) -> bool {
        self.processors
            .iter()
            .all(|processor| processor.converter().is_none())
    }
}

#[derive(Debug, Clone)]
pub enum Parameter {
    Argument(Argument),
    Option(OptionParam),
}

impl Parameter {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Parameter::Argument(argument) => &argument.name,
            Parameter::Option(option) => &option.name,
        }
    }

    #[must_use]
    pub fn doc(&self) -> &str {
        match self {
            Parameter::Argument(argument) => &argument.doc,
            Parameter::Option(option) => &option.doc,
        }
    }

    #[must_use]
    pub fn ty(&self) -> &TypeDescriptor {
        match self {
            Parameter::Argument(argument) => &argument.ty,
            Parameter::Option(option) => &option.ty,
        }
    }

    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        match self {
            Parameter::Argument(argument) => argument.default.as_ref(),
            Parameter::Option(option) => option.default.as_ref(),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_argument(&self) -> Option<&Argument> {
        match self {
            Parameter::Argument(argument) => Some(argument),
            Parameter::Option(_) => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_option(&self) -> Option<&OptionParam> {
        match self {
            Parameter::Option(option) => Some(option),
            Parameter::Argument(_) => None,
        }
    }

    /// The converter used for config overrides, plus whether the parameter
    /// holds a list.
    #[must_use]
    pub fn override_converter(&self) -> (Converter, bool) {
        match self {
            Parameter::Argument(argument) => (argument.converter.clone(), argument.variadic),
            Parameter::Option(option) => option
                .processors
                .iter()
                .find_map(|processor| {
                    processor
                        .converter()
                        .map(|converter| (converter.clone(), processor.produces_list()))
                })
                .unwrap_or((
                    Converter::Scalar(crate::signature::ScalarKind::Bool),
                    false,
                )),
        }
    }
}

/// An entry in a parameter group
#[derive(Debug, Clone)]
pub enum Member {
    Parameter(Parameter),
    Group(GroupId),
}
