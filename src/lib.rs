/*!
Turn the typed signature of a callable or a class into a hierarchical command
line interface.

The pipeline runs in three stages, each driven by a per-invocation
[`Config`]:

- [`build`] walks an [`ObjSignature`] and produces a [`CommandTree`]: a
  command with its own parameter group (positional arguments, triggered
  options, and nested groups for object-typed parameters) plus one
  subcommand per method of the object the callable returns.
- [`parse`] consumes a flat token stream against the tree, collecting every
  problem it finds into a single [`ParseErrors`] instead of stopping at the
  first one.
- [`Runner`] ties the two together and invokes each command's handler along
  the subcommand chain.

Construction and parsing fire named [`events`] that callbacks can hook to
rewrite signatures, groups and parsed values; the bundled [`plugins`] (help,
the `--0` list separator, config-file defaults and trigger mapping) are built
entirely on those hooks.

Signatures are usually produced by an external adapter implementing
[`SignatureSource`], but they can also be written by hand:

```
use ignite::{Config, ObjSignature, ParameterSignature, ScalarKind, TypeDescriptor, build, parse};
use ignite::dispatch::Outcome;

let signature = ObjSignature::new("demo.greet")
    .param(ParameterSignature::new("name", TypeDescriptor::Scalar(ScalarKind::Str)))
    .param(ParameterSignature::new("times", TypeDescriptor::Scalar(ScalarKind::Int)).default(1_i64));

let mut config = Config::new();
let tree = build(&mut config, "greet", &signature).unwrap();

match parse(&mut config, &tree, &["world", "--times", "3"]).unwrap() {
    Outcome::Complete(invocations) => {
        let args = &invocations[0].args;
        assert_eq!(args.get("name").and_then(|v| v.as_str()), Some("world"));
        assert_eq!(args.get("times").and_then(|v| v.as_int()), Some(3));
    }
    Outcome::Stopped { .. } => unreachable!(),
}
```
*/

pub mod builder;
pub mod command;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod group;
pub mod overrides;
pub mod parameter;
pub mod plugins;
pub mod runner;
pub mod signature;
mod table;
pub mod tree;
pub mod trigger;
pub mod value;

pub use ignite_parser::Arg;

pub use crate::{
    builder::build,
    config::Config,
    dispatch::parse,
    errors::{Error, ParseErrors},
    runner::{RunOutcome, Runner},
    signature::{ObjSignature, ParamKind, ParameterSignature, ScalarKind, SignatureSource, TypeDescriptor},
    tree::CommandTree,
    value::{CallArgs, Value},
};
