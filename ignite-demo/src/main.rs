mod error;

use std::{
    env,
    fmt::{self, Display},
    io,
    path::PathBuf,
    rc::Rc,
};

use ignite::{
    CallArgs, Config, ObjSignature, ParameterSignature, Runner, ScalarKind, SignatureSource,
    TypeDescriptor, Value,
    errors::{InvokeError, SignatureExtractionError},
    events::Scope,
    overrides::Overrides,
    plugins::{
        defaults,
        triggers::{self, trigger_map},
    },
    signature::Object,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::DemoError;

/// Where extra defaults come from: `TRAINER_DEFAULTS="fit.epochs=20,model.arch=cnn"`
const DEFAULTS_VAR: &str = "TRAINER_DEFAULTS";

#[derive(Debug)]
struct Trainer {
    data: PathBuf,
    arch: String,
    layers: i64,
    dropout: f64,
    seed: Option<i64>,
    verbose: bool,
}

#[derive(Debug)]
struct Report {
    command: &'static str,
    summary: String,
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.command, self.summary)
    }
}

fn str_arg<'a>(args: &'a CallArgs, path: &'static str) -> Result<&'a str, DemoError> {
    args.get_path(path)
        .and_then(Value::as_str)
        .ok_or(DemoError::MissingArgument(path))
}

fn int_arg(args: &CallArgs, path: &'static str) -> Result<i64, DemoError> {
    args.get_path(path)
        .and_then(Value::as_int)
        .ok_or(DemoError::MissingArgument(path))
}

fn float_arg(args: &CallArgs, path: &'static str) -> Result<f64, DemoError> {
    args.get_path(path)
        .and_then(Value::as_float)
        .ok_or(DemoError::MissingArgument(path))
}

fn trainer(receiver: Option<&Object>, method: &'static str) -> Result<Rc<Trainer>, DemoError> {
    receiver
        .cloned()
        .and_then(|object| object.downcast::<Trainer>().ok())
        .ok_or(DemoError::MissingReceiver { method })
}

fn construct(args: &CallArgs) -> Result<Object, DemoError> {
    let trainer = Trainer {
        data: args
            .get("data")
            .and_then(Value::as_path)
            .cloned()
            .ok_or(DemoError::MissingArgument("data"))?,
        arch: str_arg(args, "model.arch")?.to_owned(),
        layers: int_arg(args, "model.layers")?,
        dropout: float_arg(args, "model.dropout")?,
        seed: args.get("seed").and_then(Value::as_int),
        verbose: args
            .get("verbose")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    };

    debug!(?trainer, "constructed");
    Ok(Rc::new(trainer))
}

fn fit(receiver: Option<&Object>, args: &CallArgs) -> Result<Object, DemoError> {
    let trainer = trainer(receiver, "fit")?;
    let epochs = int_arg(args, "epochs")?;
    let rate = float_arg(args, "learning_rate")?;
    let tags = args
        .get("tags")
        .and_then(Value::as_list)
        .unwrap_or_default();

    if trainer.verbose {
        info!(?tags, "fitting");
    }

    Ok(Rc::new(Report {
        command: "fit",
        summary: format!(
            "{arch} x{layers} (dropout {dropout}, seed {seed:?}) on {data} for {epochs} epochs at {rate}; tags: {tags}",
            arch = trainer.arch,
            layers = trainer.layers,
            dropout = trainer.dropout,
            seed = trainer.seed,
            data = trainer.data.display(),
            tags = Value::List(tags.to_vec()),
        ),
    }))
}

fn evaluate(receiver: Option<&Object>, args: &CallArgs) -> Result<Object, DemoError> {
    let trainer = trainer(receiver, "evaluate")?;
    let splits = args
        .get("splits")
        .and_then(Value::as_list)
        .unwrap_or_default();

    Ok(Rc::new(Report {
        command: "evaluate",
        summary: format!(
            "{arch} on {data}, splits: {splits}",
            arch = trainer.arch,
            data = trainer.data.display(),
            splits = Value::List(splits.to_vec()),
        ),
    }))
}

fn invoke(
    handler: fn(Option<&Object>, &CallArgs) -> Result<Object, DemoError>,
) -> impl Fn(Option<&Object>, &CallArgs) -> Result<Object, InvokeError> {
    move |receiver, args| handler(receiver, args).map_err(InvokeError::new)
}

/// Stands in for a reflection adapter: describes the trainer by hand.
struct TrainerSource;

impl SignatureSource for TrainerSource {
    fn extract(&self) -> Result<ObjSignature, SignatureExtractionError> {
        let int = || TypeDescriptor::Scalar(ScalarKind::Int);
        let string = || TypeDescriptor::Scalar(ScalarKind::Str);

        let model = ObjSignature::new("demo.Model")
            .doc("Model architecture")
            .param(
                ParameterSignature::new(
                    "arch",
                    TypeDescriptor::choice(["mlp", "cnn", "transformer"]),
                )
                .default("mlp")
                .doc("Network family"),
            )
            .param(
                ParameterSignature::new("layers", int())
                    .default(2_i64)
                    .doc("Number of hidden layers"),
            )
            .param(
                ParameterSignature::new("dropout", TypeDescriptor::Custom("fraction".into()))
                    .default(0.1)
                    .doc("Dropout rate, written as a fraction such as 1/10"),
            );

        let fit = ObjSignature::new("demo.Trainer.fit")
            .doc("Train the model on the dataset")
            .param(
                ParameterSignature::new("epochs", int())
                    .default(10_i64)
                    .short('e')
                    .doc("Passes over the dataset"),
            )
            .param(
                ParameterSignature::new("learning_rate", TypeDescriptor::Scalar(ScalarKind::Float))
                    .default(0.01)
                    .doc("Optimizer step size"),
            )
            .param(
                ParameterSignature::new("tags", TypeDescriptor::sequence_of(string()))
                    .default(Vec::<Value>::new())
                    .doc("Labels attached to the run; repeat to add more"),
            )
            .handler(invoke(fit));

        let evaluate = ObjSignature::new("demo.Trainer.evaluate")
            .doc("Score the model on one or more dataset splits")
            .param(
                ParameterSignature::new("splits", string())
                    .variadic()
                    .doc("Splits to evaluate, such as train or test"),
            )
            .handler(invoke(evaluate));

        let instance = ObjSignature::new("demo.Trainer")
            .method(fit)
            .method(evaluate);

        Ok(ObjSignature::new("demo.Trainer")
            .doc("Train and evaluate a toy model.\n\nEach subcommand runs against the trainer built from the top-level arguments.")
            .param(
                ParameterSignature::new("data", TypeDescriptor::Scalar(ScalarKind::Path))
                    .doc("Dataset directory"),
            )
            .param(ParameterSignature::new("model", TypeDescriptor::object(model)))
            .param(
                ParameterSignature::new("seed", TypeDescriptor::optional_of(int()))
                    .doc("Random seed; random when omitted"),
            )
            .param(
                ParameterSignature::new("verbose", TypeDescriptor::Scalar(ScalarKind::Bool))
                    .default(false)
                    .doc("Log progress"),
            )
            .returns_instance(instance)
            .handler(invoke(|_, args| construct(args))))
    }
}

fn parse_fraction(raw: &str) -> Result<Value, String> {
    let (numerator, denominator) = raw
        .split_once('/')
        .ok_or_else(|| DemoError::NotAFraction(raw.to_owned()).to_string())?;

    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|_| DemoError::NotAFraction(raw.to_owned()).to_string())
    };

    let (numerator, denominator) = (parse(numerator)?, parse(denominator)?);

    if denominator == 0.0 {
        return Err(DemoError::ZeroDenominator(raw.to_owned()).to_string());
    }

    Ok(Value::Float(numerator / denominator))
}

/// Parse `key=value,key=v1 v2` into overrides
fn parse_overrides(raw: &str) -> Result<Overrides, DemoError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(key, value)| (key.trim(), value.split_whitespace()))
                .ok_or_else(|| DemoError::MalformedOverride(entry.to_owned()))
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let overrides = match env::var(DEFAULTS_VAR) {
        Ok(raw) => parse_overrides(&raw)?,
        Err(_) => Overrides::new(),
    };

    let mut config = Config::new();
    config.converters.register("fraction", parse_fraction);
    defaults::register(&mut config, overrides);
    triggers::register(
        &mut config,
        Scope::object("demo.Trainer"),
        trigger_map([("--verbose", &["--verbose", "-v"][..])]),
    );

    let tokens: Vec<String> = env::args().skip(1).collect();
    let runner = Runner::from_source(config, "trainer", &TrainerSource)?;

    if let Some(report) = runner
        .run_or_exit(&tokens)
        .and_then(|result| result.downcast::<Report>().ok())
    {
        println!("{report}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions() {
        assert_eq!(parse_fraction("3/4"), Ok(Value::Float(0.75)));
        assert!(parse_fraction("3").is_err());
        assert!(parse_fraction("1/0").is_err());
    }

    #[test]
    fn overrides_from_the_environment() {
        let overrides = parse_overrides("fit.epochs=20, fit.tags=a b").unwrap();
        assert_eq!(overrides.get("fit.epochs"), Some(&["20".to_owned()][..]));
        assert_eq!(
            overrides.get("fit.tags"),
            Some(&["a".to_owned(), "b".to_owned()][..])
        );
        assert!(parse_overrides("nonsense").is_err());
    }

    #[test]
    fn fit_runs_against_the_constructed_trainer() {
        let mut config = Config::new();
        config.converters.register("fraction", parse_fraction);

        let mut runner = Runner::from_source(config, "trainer", &TrainerSource).unwrap();
        let outcome = runner
            .run(&["data", "--model-dropout", "1/4", "fit", "-e", "3"])
            .unwrap();

        let ignite::RunOutcome::Finished(Some(result)) = outcome else {
            panic!("expected a result, got {outcome:?}");
        };
        let report = result.downcast::<Report>().unwrap();
        assert_eq!(report.command, "fit");
        assert!(report.summary.contains("dropout 0.25"));
        assert!(report.summary.contains("for 3 epochs"));
    }
}
