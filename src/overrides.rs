/*!
Config overrides and default layering.

An external collaborator (a config file loader, the environment) supplies a
flat map of dotted parameter paths to raw tokens. Layering is a pure step,
[`apply_overrides`], from a command's declared defaults to its effective
defaults. The parser only ever sees the result.

Keys are the subcommand names below the root, then the parameter path:
`epochs` for a root parameter, `fit.epochs` for a parameter of the `fit`
subcommand, `fit.model.arch` for a nested one.
*/

use itertools::Itertools;
use tracing::trace;

use crate::{
    command::CommandId,
    convert::Converter,
    errors::ParseError,
    tree::CommandTree,
    value::Value,
};

/// Dotted parameter path to raw tokens, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    entries: Vec<(String, Vec<String>)>,
}

impl Overrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw tokens for a key, replacing any earlier entry
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        tokens: impl IntoIterator<Item = impl Into<String>>,
    ) {
        let key = key.into();
        let tokens = tokens.into_iter().map(Into::into).collect();

        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = tokens,
            None => self.entries.push((key, tokens)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, tokens)| tokens.as_slice())
    }

    /// Merge `other` into `self`; entries from `other` win.
    pub fn merge(&mut self, other: &Overrides) {
        for (key, tokens) in &other.entries {
            self.insert(key.as_str(), tokens.iter().map(String::as_str));
        }
    }

    /// The entries below a subcommand path, with that path stripped from
    /// their keys.
    #[must_use]
    pub fn scoped(&self, path: &[String]) -> Overrides {
        let prefix = path.iter().map(|segment| format!("{segment}.")).join("");

        Overrides {
            entries: self
                .entries
                .iter()
                .filter_map(|(key, tokens)| {
                    key.strip_prefix(prefix.as_str())
                        .map(|key| (key.to_owned(), tokens.clone()))
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, tokens)| (key.as_str(), tokens.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V, T> FromIterator<(K, V)> for Overrides
where
    K: Into<String>,
    V: IntoIterator<Item = T>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut overrides = Overrides::new();
        iter.into_iter()
            .for_each(|(key, tokens)| overrides.insert(key, tokens));
        overrides
    }
}

/// The default of one parameter, along with what's needed to convert an
/// override for it.
#[derive(Debug, Clone)]
pub struct DefaultEntry {
    pub path: String,
    pub default: Option<Value>,
    converter: Converter,
    list: bool,
}

impl DefaultEntry {
    fn convert(&self, raw: &[String]) -> Result<Value, ParseError> {
        let fail = |raw: &str, message: String| ParseError::Conversion {
            parameter: self.path.clone(),
            raw: raw.to_owned(),
            target: self.converter.target(),
            message,
        };

        let raw: Vec<&str> = raw.iter().map(String::as_str).collect();
        let width = self.converter.width();
        let convert = |tokens: &[&str]| {
            self.converter
                .convert_tokens(tokens)
                .map_err(|message| fail(&tokens.join(" "), message))
        };

        match self.list {
            true => {
                let chunks = raw.chunks_exact(width);
                if !chunks.remainder().is_empty() {
                    return Err(fail(
                        &raw.join(" "),
                        format!("expected values in groups of {width}"),
                    ));
                }

                chunks.map(convert).collect::<Result<Vec<_>, _>>().map(Value::List)
            }
            false => convert(&raw),
        }
    }
}

/// The defaults of one command's parameters, keyed by dotted path
#[derive(Debug, Clone, Default)]
pub struct DefaultTable {
    entries: Vec<DefaultEntry>,
}

impl DefaultTable {
    /// The defaults as declared by the signatures
    #[must_use]
    pub fn declared(tree: &CommandTree, command: CommandId) -> Self {
        let entries = tree
            .leaves(command)
            .into_iter()
            .map(|leaf| {
                let (converter, list) = leaf.parameter.override_converter();

                DefaultEntry {
                    path: leaf.dotted(),
                    default: leaf.parameter.default().cloned(),
                    converter,
                    list,
                }
            })
            .collect();

        Self { entries }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .and_then(|entry| entry.default.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DefaultEntry> {
        self.entries.iter()
    }
}

/**
Layer overrides over declared defaults, producing the effective defaults.
`overrides` must already be scoped to the command (see
[`Overrides::scoped`]). Keys that don't name a parameter of the command are
ignored: they may belong to a subcommand. Every override that fails to
convert is reported.
*/
pub fn apply_overrides(
    declared: &DefaultTable,
    overrides: &Overrides,
) -> Result<DefaultTable, Vec<ParseError>> {
    let mut effective = declared.clone();
    let mut errors = Vec::new();

    for entry in &mut effective.entries {
        let Some(raw) = overrides.get(&entry.path) else {
            continue;
        };

        match entry.convert(raw) {
            Ok(value) => {
                trace!(path = %entry.path, %value, "default overridden");
                entry.default = Some(value);
            }
            Err(error) => errors.push(error),
        }
    }

    match errors.is_empty() {
        true => Ok(effective),
        false => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ScalarKind;

    fn entry(path: &str, default: Option<Value>, kind: ScalarKind, list: bool) -> DefaultEntry {
        DefaultEntry {
            path: path.into(),
            default,
            converter: Converter::Scalar(kind),
            list,
        }
    }

    fn declared() -> DefaultTable {
        DefaultTable {
            entries: vec![
                entry("epochs", Some(Value::Int(10)), ScalarKind::Int, false),
                entry("model.arch", Some("resnet".into()), ScalarKind::Str, false),
                entry("tags", None, ScalarKind::Str, true),
            ],
        }
    }

    #[test]
    fn overrides_replace_declared_defaults() {
        let overrides: Overrides = [
            ("epochs", vec!["3"]),
            ("tags", vec!["a", "b"]),
            ("unrelated.key", vec!["x"]),
        ]
        .into_iter()
        .collect();

        let effective = apply_overrides(&declared(), &overrides).unwrap();

        assert_eq!(effective.get("epochs"), Some(&Value::Int(3)));
        assert_eq!(effective.get("model.arch"), Some(&Value::from("resnet")));
        assert_eq!(effective.get("tags"), Some(&Value::from(vec!["a", "b"])));
    }

    #[test]
    fn bad_overrides_are_all_reported() {
        let overrides: Overrides = [("epochs", vec!["ten"]), ("model.arch", vec!["a", "b"])]
            .into_iter()
            .collect();

        let errors = apply_overrides(&declared(), &overrides).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn scoping_strips_the_subcommand_path() {
        let overrides: Overrides = [
            ("epochs", vec!["1"]),
            ("fit.epochs", vec!["2"]),
            ("fit.model.arch", vec!["vit"]),
        ]
        .into_iter()
        .collect();

        let scoped = overrides.scoped(&["fit".to_owned()]);
        let keys: Vec<&str> = scoped.iter().map(|(key, _)| key).collect();

        assert_eq!(keys, ["epochs", "model.arch"]);
        assert_eq!(overrides.scoped(&[]), overrides);
    }

    #[test]
    fn merge_prefers_the_newer_entry() {
        let mut base: Overrides = [("a", vec!["1"]), ("b", vec!["2"])].into_iter().collect();
        let newer: Overrides = [("b", vec!["3"])].into_iter().collect();
        base.merge(&newer);

        assert_eq!(base.get("b"), Some(&["3".to_owned()][..]));
        assert_eq!(base.get("a"), Some(&["1".to_owned()][..]));
    }
}
