/*!
Converters turn raw tokens into a typed [`Value`]. Most take a single token;
a tuple takes one token per member. Built-in scalar, choice, union and tuple
converters are always available; anything else is registered by type name in
a [`ConverterStore`].
*/

use std::{fmt, path::PathBuf, rc::Rc};

use joinery::JoinableIterator;

use crate::{
    signature::{ScalarKind, TypeDescriptor},
    value::Value,
};

type ConvertFn = Rc<dyn Fn(&str) -> Result<Value, String>>;

#[derive(Clone)]
pub enum Converter {
    Scalar(ScalarKind),
    Choice(Rc<[String]>),
    Custom { name: String, convert: ConvertFn },

    /// Try each member in order; the first that accepts the tokens wins.
    /// Every member has the same width.
    Union(Rc<[Converter]>),

    /// A fixed-size group of values, converted member by member into a list
    Tuple(Rc<[Converter]>),
}

impl Converter {
    /// Convert a raw token. The error is a message describing what went
    /// wrong; callers attach the parameter and token.
    pub fn convert(&self, raw: &str) -> Result<Value, String> {
        match self {
            Converter::Scalar(kind) => convert_scalar(*kind, raw),
            Converter::Choice(choices) => match choices.iter().any(|choice| choice == raw) {
                true => Ok(Value::Str(raw.to_owned())),
                false => Err(format!(
                    "expected one of {}",
                    choices.iter().join_with(", ")
                )),
            },
            Converter::Custom { convert, .. } => convert(raw),
            Converter::Union(_) | Converter::Tuple(_) => self.convert_tokens(&[raw]),
        }
    }

    /// How many tokens one value takes
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Converter::Tuple(members) => members.iter().map(Converter::width).sum(),
            Converter::Union(members) => members.first().map_or(1, Converter::width),
            _ => 1,
        }
    }

    /// Convert exactly [`width`](Converter::width) tokens into one value.
    pub fn convert_tokens(&self, raw: &[&str]) -> Result<Value, String> {
        match (self.width(), raw.len()) {
            (width, given) if width == given => {}
            (1, given) => return Err(format!("expected a single value, got {given}")),
            (width, given) => return Err(format!("expected {width} values, got {given}")),
        }

        match self {
            Converter::Union(members) => members
                .iter()
                .find_map(|member| member.convert_tokens(raw).ok())
                .ok_or_else(|| format!("expected one of {}", self.target())),
            Converter::Tuple(members) => {
                let mut rest = raw;
                let mut values = Vec::with_capacity(members.len());

                for member in members.iter() {
                    let (head, tail) = rest.split_at(member.width());
                    values.push(member.convert_tokens(head)?);
                    rest = tail;
                }

                Ok(Value::List(values))
            }
            _ => raw
                .first()
                .map_or_else(|| Err("expected a value".to_owned()), |single| self.convert(single)),
        }
    }

    /// The name of the type this converter produces
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Converter::Scalar(kind) => kind.name().to_owned(),
            Converter::Choice(choices) => format!("{{{}}}", choices.join(",")),
            Converter::Custom { name, .. } => name.clone(),
            Converter::Union(members) => members.iter().map(Converter::target).join_with(" | ").to_string(),
            Converter::Tuple(members) => format!(
                "({})",
                members.iter().map(Converter::target).join_with(", ")
            ),
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Converter::Scalar(kind) => f.debug_tuple("Scalar").field(kind).finish(),
            Converter::Choice(choices) => f.debug_tuple("Choice").field(choices).finish(),
            Converter::Custom { name, .. } => f
                .debug_struct("Custom")
                .field("name", name)
                .finish_non_exhaustive(),
            Converter::Union(members) => f.debug_tuple("Union").field(members).finish(),
            Converter::Tuple(members) => f.debug_tuple("Tuple").field(members).finish(),
        }
    }
}

fn convert_scalar(kind: ScalarKind, raw: &str) -> Result<Value, String> {
    match kind {
        ScalarKind::Str => Ok(Value::Str(raw.to_owned())),
        ScalarKind::Int => raw
            .parse()
            .map(Value::Int)
            .map_err(|err| format!("{err}")),
        ScalarKind::Float => raw
            .parse()
            .map(Value::Float)
            .map_err(|err| format!("{err}")),
        ScalarKind::Bool => parse_bool(raw).map(Value::Bool),
        ScalarKind::Path => match raw.is_empty() {
            true => Err("path can't be empty".to_owned()),
            false => Ok(Value::Path(PathBuf::from(raw))),
        },
    }
}

/// Case-insensitive boolean parsing: `true`/`t`/`yes`/`1` and
/// `false`/`f`/`no`/`0`.
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    const TRUE: &[&str] = &["true", "t", "yes", "1"];
    const FALSE: &[&str] = &["false", "f", "no", "0"];

    if TRUE.iter().any(|word| raw.eq_ignore_ascii_case(word)) {
        Ok(true)
    } else if FALSE.iter().any(|word| raw.eq_ignore_ascii_case(word)) {
        Ok(false)
    } else {
        Err("expected a boolean (true/false, yes/no, 1/0)".to_owned())
    }
}

/// Custom converters, keyed by the name used in [`TypeDescriptor::Custom`].
#[derive(Clone, Default)]
pub struct ConverterStore {
    custom: Vec<(String, Converter)>,
}

impl ConverterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the converter for a custom type name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        convert: impl Fn(&str) -> Result<Value, String> + 'static,
    ) {
        let name = name.into();
        let converter = Converter::Custom {
            name: name.clone(),
            convert: Rc::new(convert),
        };

        match self.custom.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = converter,
            None => self.custom.push((name, converter)),
        }
    }

    /// Find the converter for one value of the given type. Sequences,
    /// objects and the unit type have no converter; optional types convert
    /// as their inner type. A union whose members take different numbers of
    /// tokens has no converter either.
    #[must_use]
    pub fn resolve(&self, ty: &TypeDescriptor) -> Option<Converter> {
        match ty {
            TypeDescriptor::Scalar(kind) => Some(Converter::Scalar(*kind)),
            TypeDescriptor::Choice(choices) => Some(Converter::Choice(choices.as_slice().into())),
            TypeDescriptor::Custom(name) => self
                .custom
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, converter)| converter.clone()),
            TypeDescriptor::Optional(inner) => self.resolve(inner),
            TypeDescriptor::Union(members) => {
                let members = self.resolve_all(members)?;
                let width = members.first()?.width();

                members
                    .iter()
                    .all(|member| member.width() == width)
                    .then(|| Converter::Union(members.into()))
            }
            TypeDescriptor::Tuple(members) => match members.is_empty() {
                true => None,
                false => Some(Converter::Tuple(self.resolve_all(members)?.into())),
            },
            TypeDescriptor::Object(_) | TypeDescriptor::Sequence(_) | TypeDescriptor::Unit => None,
        }
    }

    fn resolve_all(&self, types: &[TypeDescriptor]) -> Option<Vec<Converter>> {
        types.iter().map(|ty| self.resolve(ty)).collect()
    }
}

impl fmt::Debug for ConverterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.custom.iter().map(|(name, _)| name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("true", true)]
    #[case("T", true)]
    #[case("Yes", true)]
    #[case("1", true)]
    #[case("false", false)]
    #[case("f", false)]
    #[case("NO", false)]
    #[case("0", false)]
    fn booleans(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(parse_bool(raw), Ok(expected));
    }

    #[test]
    fn bad_boolean() {
        assert!(parse_bool("maybe").is_err());
    }

    #[rstest]
    #[case(ScalarKind::Int, "42", Value::Int(42))]
    #[case(ScalarKind::Float, "0.5", Value::Float(0.5))]
    #[case(ScalarKind::Str, "hello", Value::from("hello"))]
    #[case(ScalarKind::Path, "data/x.csv", Value::Path(PathBuf::from("data/x.csv")))]
    fn scalars(#[case] kind: ScalarKind, #[case] raw: &str, #[case] expected: Value) {
        assert_eq!(Converter::Scalar(kind).convert(raw), Ok(expected));
    }

    #[test]
    fn choices_reject_unknown_values() {
        let store = ConverterStore::new();
        let converter = store
            .resolve(&TypeDescriptor::choice(["relu", "gelu"]))
            .expect("choices always resolve");

        assert_eq!(converter.convert("gelu"), Ok(Value::from("gelu")));

        let error = converter.convert("tanh").unwrap_err();
        assert_eq!(error, "expected one of relu, gelu");
    }

    #[test]
    fn custom_converters_resolve_by_name() {
        let mut store = ConverterStore::new();
        store.register("fraction", |raw| {
            let (num, den) = raw.split_once('/').ok_or("expected n/d")?;
            let num: f64 = num.parse().map_err(|_| "bad numerator")?;
            let den: f64 = den.parse().map_err(|_| "bad denominator")?;
            Ok(Value::Float(num / den))
        });

        let converter = store
            .resolve(&TypeDescriptor::optional_of(TypeDescriptor::Custom(
                "fraction".into(),
            )))
            .expect("registered");

        assert_eq!(converter.target(), "fraction");
        assert_eq!(converter.convert("3/4"), Ok(Value::Float(0.75)));
        assert!(converter.convert("3").is_err());
        assert!(store.resolve(&TypeDescriptor::Custom("other".into())).is_none());
    }

    #[rstest]
    #[case("7", Value::Int(7))]
    #[case("0.5", Value::Float(0.5))]
    #[case("auto", Value::from("auto"))]
    fn unions_take_the_first_member_that_accepts(#[case] raw: &str, #[case] expected: Value) {
        let converter = ConverterStore::new()
            .resolve(&TypeDescriptor::Union(vec![
                TypeDescriptor::Scalar(ScalarKind::Int),
                TypeDescriptor::Scalar(ScalarKind::Float),
                TypeDescriptor::choice(["auto"]),
            ]))
            .expect("scalar unions resolve");

        assert_eq!(converter.width(), 1);
        assert_eq!(converter.convert(raw), Ok(expected));
        assert_eq!(
            converter.convert("never"),
            Err("expected one of int | float | {auto}".to_owned())
        );
    }

    #[test]
    fn tuples_take_one_token_per_member() {
        let converter = ConverterStore::new()
            .resolve(&TypeDescriptor::Tuple(vec![
                TypeDescriptor::Scalar(ScalarKind::Str),
                TypeDescriptor::Tuple(vec![
                    TypeDescriptor::Scalar(ScalarKind::Int),
                    TypeDescriptor::Scalar(ScalarKind::Int),
                ]),
            ]))
            .expect("scalar tuples resolve");

        assert_eq!(converter.width(), 3);
        assert_eq!(converter.target(), "(str, (int, int))");
        assert_eq!(
            converter.convert_tokens(&["crop", "32", "-4"]),
            Ok(Value::List(vec![
                Value::from("crop"),
                Value::from(vec![32_i64, -4]),
            ]))
        );
        assert!(converter.convert_tokens(&["crop", "32"]).is_err());
        assert!(converter.convert_tokens(&["crop", "x", "1"]).is_err());
    }

    #[test]
    fn unions_of_different_widths_have_no_converter() {
        let store = ConverterStore::new();
        let mixed = TypeDescriptor::Union(vec![
            TypeDescriptor::Scalar(ScalarKind::Int),
            TypeDescriptor::Tuple(vec![
                TypeDescriptor::Scalar(ScalarKind::Int),
                TypeDescriptor::Scalar(ScalarKind::Int),
            ]),
        ]);

        assert!(store.resolve(&mixed).is_none());
        assert!(store.resolve(&TypeDescriptor::Tuple(Vec::new())).is_none());
    }
}
