/*!
Typed values produced by converters, and the nested call arguments handed to
command handlers.
*/

use std::{fmt, path::PathBuf};

use joinery::JoinableIterator;

/// A converted parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    List(Vec<Value>),

    /// The resolved fields of a nested parameter group
    Group(CallArgs),
}

impl Value {
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(value) => Some(value),
            Value::Int(value) => Some(value as f64),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Value::Path(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_group(&self) -> Option<&CallArgs> {
        match self {
            Value::Group(args) => Some(args),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Str(value) => f.write_str(value),
            Value::Path(value) => write!(f, "{}", value.display()),
            Value::List(values) => write!(f, "[{}]", values.iter().join_with(", ")),
            Value::Group(args) => write!(f, "{args}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Value::Path(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/**
The arguments for a single call, in parameter declaration order. Nested
parameter groups appear as [`Value::Group`] entries, so `model.arch` is
reachable with [`CallArgs::get_path`].
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    entries: Vec<(String, Value)>,
}

impl CallArgs {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();

        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Set a value at a nested path, creating intermediate groups as needed.
    /// An empty path does nothing.
    pub fn insert_path(&mut self, path: &[String], value: Value) {
        match path {
            [] => {}
            [name] => self.insert(name.as_str(), value),
            [head, rest @ ..] => {
                let position = self.entries.iter().position(|(key, _)| key == head);

                let index = match position {
                    Some(index) => index,
                    None => {
                        self.entries
                            .push((head.clone(), Value::Group(CallArgs::new())));
                        self.entries.len() - 1
                    }
                };

                let slot = &mut self.entries[index].1;
                if !matches!(slot, Value::Group(_)) {
                    *slot = Value::Group(CallArgs::new());
                }

                if let Value::Group(group) = slot {
                    group.insert_path(rest, value);
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Look up a dotted path, such as `model.arch`
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = self.get(segments.next()?)?;

        segments.try_fold(first, |value, segment| value.as_group()?.get(segment))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for CallArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .entries
            .iter()
            .map(|(key, value)| lazy_format::lazy_format!("{key}={value}"));

        write!(f, "{{{}}}", fields.join_with(", "))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for CallArgs {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut args = CallArgs::new();
        iter.into_iter()
            .for_each(|(key, value)| args.insert(key, value));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths_create_groups() {
        let mut args = CallArgs::new();
        args.insert("epochs", Value::Int(3));
        args.insert_path(&["model".into(), "arch".into()], "resnet".into());
        args.insert_path(&["model".into(), "depth".into()], Value::Int(50));

        assert_eq!(args.len(), 2);
        assert_eq!(args.get_path("model.arch"), Some(&Value::from("resnet")));
        assert_eq!(args.get_path("model.depth"), Some(&Value::Int(50)));
        assert_eq!(args.get_path("model.missing"), None);
        assert_eq!(args.get_path("epochs.arch"), None);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut args: CallArgs = [("a", Value::Int(1)), ("b", Value::Int(2))]
            .into_iter()
            .collect();
        args.insert("a", Value::Int(10));

        let keys: Vec<&str> = args.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(args.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn display_renders_lists_and_groups() {
        let value = Value::from(vec![1_i64, 2, 3]);
        assert_eq!(value.to_string(), "[1, 2, 3]");

        let args: CallArgs = [("x", Value::Bool(true))].into_iter().collect();
        assert_eq!(Value::Group(args).to_string(), "{x=true}");
    }
}
