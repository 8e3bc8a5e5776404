/*!
Trigger processors: the unit that turns the tokens following an option
trigger into a new value for that option.
*/

use crate::{convert::Converter, value::Value};

/// How many tokens a processor wants after its trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// A flag; consumes nothing
    Zero,

    /// A fixed number of values: one, or one per member of a tuple
    Exactly(usize),

    /// A run of values, ended by the next recognized trigger
    Run,
}

#[derive(Debug, Clone)]
pub enum TriggerProcessor {
    /// Overwrite the target with a fixed value. Used for flags and their
    /// negations.
    Constant {
        triggers: Vec<String>,
        constant: Value,
    },

    /// Convert the value after the trigger (several tokens for a tuple).
    /// With `accumulate`, repeated occurrences are collected into a list;
    /// without it, a second occurrence is an error.
    Convert {
        triggers: Vec<String>,
        converter: Converter,
        accumulate: bool,
    },

    /// Convert every token in a run and collect them into a list. A second
    /// occurrence extends the list.
    MultiConvert {
        triggers: Vec<String>,
        converter: Converter,
    },
}

/// The result of applying a processor
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub consumed: usize,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    Conversion {
        raw: String,
        target: String,
        message: String,
    },
    MissingValue,
    Repeated,
}

impl TriggerProcessor {
    #[must_use]
    pub fn triggers(&self) -> &[String] {
        match self {
            TriggerProcessor::Constant { triggers, .. }
            | TriggerProcessor::Convert { triggers, .. }
            | TriggerProcessor::MultiConvert { triggers, .. } => triggers,
        }
    }

    pub fn triggers_mut(&mut self) -> &mut Vec<String> {
        match self {
            TriggerProcessor::Constant { triggers, .. }
            | TriggerProcessor::Convert { triggers, .. }
            | TriggerProcessor::MultiConvert { triggers, .. } => triggers,
        }
    }

    #[must_use]
    pub fn arity(&self) -> Arity {
        match self {
            TriggerProcessor::Constant { .. } => Arity::Zero,
            TriggerProcessor::Convert { converter, .. } => Arity::Exactly(converter.width()),
            TriggerProcessor::MultiConvert { .. } => Arity::Run,
        }
    }

    #[must_use]
    pub fn converter(&self) -> Option<&Converter> {
        match self {
            TriggerProcessor::Constant { .. } => None,
            TriggerProcessor::Convert { converter, .. }
            | TriggerProcessor::MultiConvert { converter, .. } => Some(converter),
        }
    }

    /// True if this processor builds a list, either by repetition or from a
    /// single run.
    #[must_use]
    pub fn produces_list(&self) -> bool {
        matches!(
            self,
            TriggerProcessor::Convert {
                accumulate: true,
                ..
            } | TriggerProcessor::MultiConvert { .. }
        )
    }

    /**
    Apply this processor. `current` is the value the command line has given
    the option so far (declared defaults never appear here), and `tokens`
    are the values gathered after the trigger, already cut to this
    processor's [`Arity`].
    */
    pub fn apply(&self, current: Option<&Value>, tokens: &[&str]) -> Result<Applied, ProcessError> {
        match self {
            TriggerProcessor::Constant { constant, .. } => Ok(Applied {
                consumed: 0,
                value: constant.clone(),
            }),
            TriggerProcessor::Convert {
                converter,
                accumulate,
                ..
            } => {
                let width = converter.width();
                let raw = tokens.get(..width).ok_or(ProcessError::MissingValue)?;
                let value = convert(converter, raw)?;

                let value = match (*accumulate, current) {
                    (true, Some(Value::List(existing))) => {
                        let mut values = existing.clone();
                        values.push(value);
                        Value::List(values)
                    }
                    (true, _) => Value::List(Vec::from([value])),
                    (false, Some(_)) => return Err(ProcessError::Repeated),
                    (false, None) => value,
                };

                Ok(Applied {
                    consumed: width,
                    value,
                })
            }
            TriggerProcessor::MultiConvert { converter, .. } => {
                let mut values = match current {
                    Some(Value::List(existing)) => existing.clone(),
                    _ => Vec::with_capacity(tokens.len()),
                };

                let chunks = tokens.chunks_exact(converter.width());
                if !chunks.remainder().is_empty() {
                    return Err(ProcessError::MissingValue);
                }

                for raw in chunks {
                    values.push(convert(converter, raw)?);
                }

                Ok(Applied {
                    consumed: tokens.len(),
                    value: Value::List(values),
                })
            }
        }
    }
}

fn convert(converter: &Converter, raw: &[&str]) -> Result<Value, ProcessError> {
    converter
        .convert_tokens(raw)
        .map_err(|message| ProcessError::Conversion {
            raw: raw.join(" "),
            target: converter.target(),
            message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ScalarKind;

    fn int_convert(accumulate: bool) -> TriggerProcessor {
        TriggerProcessor::Convert {
            triggers: vec!["--x".into()],
            converter: Converter::Scalar(ScalarKind::Int),
            accumulate,
        }
    }

    #[test]
    fn constant_overwrites_and_consumes_nothing() {
        let processor = TriggerProcessor::Constant {
            triggers: vec!["--no-x".into()],
            constant: Value::Bool(false),
        };

        let applied = processor
            .apply(Some(&Value::Bool(true)), &["ignored"])
            .unwrap();

        assert_eq!(applied.consumed, 0);
        assert_eq!(applied.value, Value::Bool(false));
    }

    #[test]
    fn repetition_accumulates_in_order() {
        let processor = int_convert(true);

        let first = processor.apply(None, &["1"]).unwrap();
        let second = processor.apply(Some(&first.value), &["2"]).unwrap();

        assert_eq!(second.value, Value::from(vec![1_i64, 2]));
    }

    #[test]
    fn non_accumulating_convert_rejects_repeats() {
        let processor = int_convert(false);

        assert_eq!(
            processor.apply(Some(&Value::Int(1)), &["2"]),
            Err(ProcessError::Repeated)
        );
        assert_eq!(processor.apply(None, &[]), Err(ProcessError::MissingValue));
    }

    #[test]
    fn multi_convert_extends_existing_lists() {
        let processor = TriggerProcessor::MultiConvert {
            triggers: vec!["--x".into()],
            converter: Converter::Scalar(ScalarKind::Int),
        };

        let applied = processor
            .apply(Some(&Value::from(vec![1_i64])), &["2", "3"])
            .unwrap();

        assert_eq!(applied.consumed, 2);
        assert_eq!(applied.value, Value::from(vec![1_i64, 2, 3]));
    }

    #[test]
    fn tuple_values_take_their_full_width() {
        let pair = Converter::Tuple(
            vec![
                Converter::Scalar(ScalarKind::Int),
                Converter::Scalar(ScalarKind::Int),
            ]
            .into(),
        );
        let processor = TriggerProcessor::MultiConvert {
            triggers: vec!["--x".into()],
            converter: pair.clone(),
        };

        let applied = processor.apply(None, &["1", "2", "3", "4"]).unwrap();
        assert_eq!(applied.consumed, 4);
        assert_eq!(
            applied.value,
            Value::List(vec![Value::from(vec![1_i64, 2]), Value::from(vec![3_i64, 4])])
        );

        assert_eq!(
            processor.apply(None, &["1", "2", "3"]),
            Err(ProcessError::MissingValue)
        );

        let single = TriggerProcessor::Convert {
            triggers: vec!["--x".into()],
            converter: pair,
            accumulate: false,
        };
        assert_eq!(single.arity(), Arity::Exactly(2));
        assert_eq!(single.apply(None, &["1"]), Err(ProcessError::MissingValue));
    }

    #[test]
    fn conversion_errors_name_the_token() {
        let error = int_convert(false).apply(None, &["ten"]).unwrap_err();

        match error {
            ProcessError::Conversion { raw, target, .. } => {
                assert_eq!(raw, "ten");
                assert_eq!(target, "int");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
