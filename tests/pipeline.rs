use std::rc::Rc;

use ignite::{
    CallArgs, Config, Error, ObjSignature, ParamKind, ParameterSignature, RunOutcome, Runner,
    ScalarKind, TypeDescriptor, Value, build,
    command::{CliCallback, Flow},
    dispatch::Outcome,
    errors::{BuildError, CallbackError, InvokeError, ParseError},
    events::{CmdPostCreate, CmdPostProcess, EventName, PgPostCreate, Scope, SigExtract, StartArgsPreProcess},
    overrides::Overrides,
    parse,
    plugins::{defaults, triggers},
    signature::Object,
};
use rstest::rstest;

fn int() -> TypeDescriptor {
    TypeDescriptor::Scalar(ScalarKind::Int)
}

fn string() -> TypeDescriptor {
    TypeDescriptor::Scalar(ScalarKind::Str)
}

fn outcome(config: &mut Config, signature: &ObjSignature, tokens: &[&str]) -> Result<Outcome, Error> {
    let tree = build(config, "prog", signature)?;
    parse(config, &tree, tokens)
}

fn last_args(config: &mut Config, signature: &ObjSignature, tokens: &[&str]) -> CallArgs {
    match outcome(config, signature, tokens) {
        Ok(Outcome::Complete(invocations)) => invocations
            .into_iter()
            .last()
            .map(|invocation| invocation.args)
            .unwrap_or_default(),
        other => panic!("expected a complete parse, got {other:?}"),
    }
}

fn stop_output(config: &mut Config, signature: &ObjSignature, tokens: &[&str]) -> String {
    match outcome(config, signature, tokens) {
        Ok(Outcome::Stopped { output, .. }) => output,
        other => panic!("expected a stop, got {other:?}"),
    }
}

/// A calculator whose constructor takes a base, with methods that act on it
fn calculator() -> ObjSignature {
    let receiver = |receiver: Option<&Object>| {
        receiver
            .and_then(|object| object.downcast_ref::<i64>())
            .copied()
            .ok_or_else(|| InvokeError::new("no receiver"))
    };

    let add = ObjSignature::new("demo.Calc.add")
        .doc("Add to the base")
        .param(ParameterSignature::new("amount", int()))
        .param(ParameterSignature::new("times", int()).default(1_i64))
        .handler(move |object, args| {
            let base = receiver(object)?;
            let amount = args.get("amount").and_then(Value::as_int).unwrap_or(0);
            let times = args.get("times").and_then(Value::as_int).unwrap_or(1);
            Ok(Rc::new(base + amount * times) as Object)
        });

    let fail = ObjSignature::new("demo.Calc.fail")
        .doc("Always fails")
        .handler(|_, _| Err(InvokeError::new("boom")));

    ObjSignature::new("demo.Calc")
        .doc("A tiny calculator")
        .param(ParameterSignature::new("base", int()).doc("Starting value"))
        .returns_instance(ObjSignature::new("demo.Calc").method(add).method(fail))
        .handler(|_, args| {
            let base = args.get("base").and_then(Value::as_int).unwrap_or(0);
            Ok(Rc::new(base) as Object)
        })
}

#[test]
fn handlers_chain_through_subcommands() {
    let mut runner = Runner::new(Config::new(), "calc", calculator());

    let RunOutcome::Finished(Some(result)) = runner.run(&["5", "add", "3", "--times", "2"]).unwrap()
    else {
        panic!("expected a result");
    };

    assert_eq!(result.downcast_ref::<i64>(), Some(&11));
}

#[test]
fn the_root_alone_returns_its_own_result() {
    let mut runner = Runner::new(Config::new(), "calc", calculator());

    let RunOutcome::Finished(Some(result)) = runner.run(&["5"]).unwrap() else {
        panic!("expected a result");
    };

    assert_eq!(result.downcast_ref::<i64>(), Some(&5));
}

#[test]
fn handler_failures_name_the_command() {
    let mut runner = Runner::new(Config::new(), "calc", calculator());

    match runner.run(&["5", "fail"]) {
        Err(Error::Invoke { command, source }) => {
            assert_eq!(command, "calc fail");
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("expected an invocation error, got {other:?}"),
    }
}

#[test]
fn subcommand_paths_are_recorded() {
    let Ok(Outcome::Complete(invocations)) =
        outcome(&mut Config::new(), &calculator(), &["5", "add", "1"])
    else {
        panic!("expected a complete parse");
    };

    let paths: Vec<Vec<String>> = invocations
        .iter()
        .map(|invocation| invocation.path.clone())
        .collect();

    assert_eq!(paths, [Vec::new(), vec!["add".to_owned()]]);
}

#[test]
fn help_stops_the_run() {
    let output = stop_output(&mut Config::new(), &calculator(), &["--help"]);

    assert!(output.contains("A tiny calculator"), "{output}");
    assert!(output.contains("Usage:"), "{output}");
    assert!(output.contains("prog <base> [COMMAND]"), "{output}");
    assert!(output.contains("Starting value"), "{output}");
    assert!(output.contains("add"), "{output}");
    assert!(output.contains("Add to the base"), "{output}");
}

#[test]
fn help_reaches_subcommands() {
    let output = stop_output(&mut Config::new(), &calculator(), &["5", "add", "-h"]);

    assert!(output.contains("prog add"), "{output}");
    assert!(output.contains("--times <TIMES>"), "{output}");
    assert!(output.contains("[default: 1]"), "{output}");
}

#[test]
fn help_wins_over_parse_errors() {
    let output = stop_output(&mut Config::new(), &calculator(), &["--bogus", "--help"]);
    assert!(output.contains("Usage:"));
}

#[test]
fn help_is_not_taken_as_an_option_value() {
    let output = stop_output(&mut Config::new(), &calculator(), &["5", "add", "--times", "--help"]);
    assert!(output.contains("prog add"), "{output}");
}

#[test]
fn bare_config_has_no_help() {
    let result = outcome(&mut Config::bare(), &calculator(), &["--help"]);
    assert!(matches!(result, Err(Error::Parse(_))));
}

fn fitter() -> ObjSignature {
    let model = ObjSignature::new("demo.Model")
        .param(ParameterSignature::new("arch", string()).default("mlp").doc("Family"));

    let fit = ObjSignature::new("demo.Trainer.fit").param(
        ParameterSignature::new("epochs", int())
            .default(10_i64)
            .doc("Passes"),
    );

    ObjSignature::new("demo.Trainer")
        .param(ParameterSignature::new("model", TypeDescriptor::object(model)))
        .returns_instance(ObjSignature::new("demo.Trainer").method(fit))
}

fn with_overrides(entries: &[(&str, &[&str])]) -> Config {
    let mut config = Config::new();
    let overrides: Overrides = entries
        .iter()
        .map(|&(key, tokens)| (key, tokens.iter().copied()))
        .collect();
    defaults::register(&mut config, overrides);
    config
}

#[rstest]
#[case::declared(&[], &["fit"], 10)]
#[case::overridden(&[("fit.epochs", &["3"][..])], &["fit"], 3)]
#[case::explicit(&[("fit.epochs", &["3"][..])], &["fit", "--epochs", "5"], 5)]
#[case::other_command(&[("epochs", &["3"][..])], &["fit"], 10)]
fn defaults_layer_under_the_command_line(
    #[case] entries: &[(&str, &[&str])],
    #[case] tokens: &[&str],
    #[case] expected: i64,
) {
    let mut config = with_overrides(entries);
    let args = last_args(&mut config, &fitter(), tokens);
    assert_eq!(args.get("epochs"), Some(&Value::Int(expected)));
}

#[test]
fn nested_defaults_can_be_overridden() {
    let mut config = with_overrides(&[("model.arch", &["cnn"][..])]);

    let Ok(Outcome::Complete(invocations)) = outcome(&mut config, &fitter(), &["fit"]) else {
        panic!("expected a complete parse");
    };

    assert_eq!(
        invocations[0].args.get_path("model.arch"),
        Some(&Value::Str("cnn".into()))
    );
}

#[test]
fn help_shows_the_effective_default() {
    let mut config = with_overrides(&[("fit.epochs", &["3"][..])]);
    let output = stop_output(&mut config, &fitter(), &["fit", "--help"]);

    assert!(output.contains("Passes [default: 3]"), "{output}");
}

#[test]
fn show_bindings_lists_every_trigger() {
    let output = stop_output(&mut Config::new(), &fitter(), &["--show-bindings"]);

    assert!(output.contains("prog (demo.Trainer)"), "{output}");
    assert!(output.contains("model.arch <- str"), "{output}");
    assert!(output.contains("callback: Show this help message and exit"), "{output}");

    let output = stop_output(&mut Config::new(), &fitter(), &["fit", "--show-bindings"]);

    assert!(output.contains("prog fit (demo.Trainer.fit)"), "{output}");
    assert!(output.contains("epochs <- int"), "{output}");
    assert!(!output.contains("model.arch"), "{output}");
}

#[test]
fn bad_overrides_are_conversion_errors() {
    let mut config = with_overrides(&[("fit.epochs", &["many"][..])]);

    let Err(Error::Parse(errors)) = outcome(&mut config, &fitter(), &["fit"]) else {
        panic!("expected parse errors");
    };

    assert!(matches!(
        errors.as_slice(),
        [ParseError::Conversion { raw, .. }] if raw == "many"
    ));
}

#[test]
fn start_callbacks_can_rewrite_tokens() {
    let mut config = Config::new();
    config.on::<StartArgsPreProcess>(Scope::Any, |start| {
        start.tokens.retain(|token| token != "--legacy");
        Ok(())
    });

    let args = last_args(&mut config, &fitter(), &["--legacy", "fit"]);
    assert_eq!(args.get("epochs"), Some(&Value::Int(10)));
}

#[test]
fn start_callbacks_can_stop_the_run() {
    let mut config = Config::new();
    config.on::<StartArgsPreProcess>(Scope::Any, |start| {
        if start.tokens.first().is_some_and(|token| token == "version") {
            start.stop("prog 1.0");
        }
        Ok(())
    });

    assert_eq!(stop_output(&mut config, &fitter(), &["version"]), "prog 1.0");
}

#[test]
fn signature_callbacks_can_flip_a_list_to_positional() {
    let signature = ObjSignature::new("demo.cat").param(
        ParameterSignature::new("files", TypeDescriptor::sequence_of(string()))
            .default(Vec::<Value>::new()),
    );

    let mut config = Config::new();
    config.on::<SigExtract>(Scope::object("demo.cat"), |signature| {
        if let Some(files) = signature.param_named_mut("files") {
            files.kind = ParamKind::Argument;
        }
        Ok(())
    });

    let args = last_args(&mut config, &signature, &["a", "b"]);
    assert_eq!(args.get("files"), Some(&Value::from(vec!["a", "b"])));
}

#[test]
fn post_process_callbacks_fill_values() {
    let signature = ObjSignature::new("demo.pair")
        .param(ParameterSignature::new("a", int()))
        .param(ParameterSignature::new("b", int()));

    let mut config = Config::new();
    config.on::<CmdPostProcess>(Scope::Any, |bound| {
        if !bound.is_explicit("b") {
            let a = bound.get("a").and_then(Value::as_int).unwrap_or(0);
            bound.set("b", Value::Int(a * 2));
        }
        Ok(())
    });

    let args = last_args(&mut config, &signature, &["4"]);
    assert_eq!(args.get("b"), Some(&Value::Int(8)));

    let args = last_args(&mut config, &signature, &["4", "1"]);
    assert_eq!(args.get("b"), Some(&Value::Int(1)));
}

#[test]
fn command_callbacks_attach_per_command() {
    let mut config = Config::new();
    config.on::<CmdPostCreate>(Scope::object("demo.Trainer.fit"), |command| {
        command.add_callback(CliCallback::new(["--dry-run"], "Print and exit", 0, |_, _| {
            Ok(Flow::Stop("dry run".into()))
        }));
        Ok(())
    });

    assert_eq!(stop_output(&mut config, &fitter(), &["fit", "--dry-run"]), "dry run");

    let result = outcome(&mut config, &fitter(), &["--dry-run"]);
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn eager_callbacks_take_their_values() {
    let mut config = Config::new();
    config.add_cli_callback(CliCallback::new(["--echo"], "Echo two values", 2, |_, values| {
        Ok(Flow::Stop(values.join("+")))
    }));

    assert_eq!(
        stop_output(&mut config, &fitter(), &["--echo", "a", "b"]),
        "a+b"
    );
}

#[test]
fn callback_failures_are_stamped_with_the_event() {
    let mut config = Config::new();
    config.on::<PgPostCreate>(Scope::object("demo.Model"), |_| {
        Err(CallbackError::new("rejected"))
    });

    match outcome(&mut config, &fitter(), &[]) {
        Err(Error::Build(BuildError::Callback(error))) => {
            assert_eq!(error.event, Some(EventName::PgPostCreate));
            assert_eq!(error.path.as_deref(), Some("demo.Model"));
        }
        other => panic!("expected a callback error, got {other:?}"),
    }
}

#[test]
fn trigger_maps_add_aliases() {
    let mut config = Config::new();
    triggers::register(
        &mut config,
        Scope::object("demo.Trainer.fit"),
        triggers::trigger_map([("--epochs", &["--epochs", "-n"][..])]),
    );

    let args = last_args(&mut config, &fitter(), &["fit", "-n", "7"]);
    assert_eq!(args.get("epochs"), Some(&Value::Int(7)));
}

#[test]
fn duplicate_triggers_fail_the_build() {
    let signature = ObjSignature::new("demo.clash")
        .param(ParameterSignature::new("verbose", TypeDescriptor::Scalar(ScalarKind::Bool)).default(false).short('v'))
        .param(ParameterSignature::new("version", string()).default("1").short('v'));

    let result = build(&mut Config::new(), "prog", &signature);

    assert!(matches!(
        result,
        Err(BuildError::DuplicateTrigger { trigger, .. }) if trigger == "-v"
    ));
}

#[test]
fn parameters_cannot_shadow_eager_callbacks() {
    let signature = ObjSignature::new("demo.helpful")
        .param(ParameterSignature::new("help", string()).default("none"));

    let result = build(&mut Config::new(), "prog", &signature);
    assert!(matches!(result, Err(BuildError::DuplicateTrigger { .. })));
}

#[rstest]
#[case::nested_lists(TypeDescriptor::sequence_of(TypeDescriptor::sequence_of(int())))]
#[case::unit(TypeDescriptor::Unit)]
#[case::list_of_objects(TypeDescriptor::sequence_of(TypeDescriptor::object(ObjSignature::new("demo.Item"))))]
fn unsupported_types_are_unclassifiable(#[case] ty: TypeDescriptor) {
    let signature = ObjSignature::new("demo.odd").param(ParameterSignature::new("odd", ty));

    let result = build(&mut Config::new(), "prog", &signature);
    assert!(matches!(result, Err(BuildError::Unclassifiable { .. })), "{result:?}");
}

#[test]
fn unknown_custom_types_have_no_converter() {
    let signature = ObjSignature::new("demo.custom")
        .param(ParameterSignature::new("ratio", TypeDescriptor::Custom("fraction".into())));

    let result = build(&mut Config::new(), "prog", &signature);
    assert!(matches!(result, Err(BuildError::NoConverter { .. })));
}

#[test]
fn custom_converters_are_used() {
    let signature = ObjSignature::new("demo.custom")
        .param(ParameterSignature::new("ratio", TypeDescriptor::Custom("fraction".into())));

    let mut config = Config::new();
    config.converters.register("fraction", |raw| {
        let (top, bottom) = raw.split_once('/').ok_or("expected a/b")?;
        let top: f64 = top.parse().map_err(|_| "bad numerator")?;
        let bottom: f64 = bottom.parse().map_err(|_| "bad denominator")?;
        Ok(Value::Float(top / bottom))
    });

    let args = last_args(&mut config, &signature, &["3/4"]);
    assert_eq!(args.get("ratio"), Some(&Value::Float(0.75)));
}

#[test]
fn duplicate_subcommands_fail_the_build() {
    let instance = ObjSignature::new("demo.Twice")
        .method(ObjSignature::new("demo.Twice.run"))
        .method(ObjSignature::new("demo.Other.run"));
    let signature = ObjSignature::new("demo.Twice").returns_instance(instance);

    let result = build(&mut Config::new(), "prog", &signature);
    assert!(matches!(result, Err(BuildError::DuplicateSubcommand { .. })));
}
