/*!
End-to-end execution: build the tree, parse the tokens, then invoke each
command's handler along the subcommand chain.
*/

use std::{
    io::{self, Write as _},
    process,
};

use tracing::{debug, instrument};

use crate::{
    builder::build,
    config::Config,
    dispatch::{Outcome, parse},
    errors::Error,
    signature::{ObjSignature, Object, SignatureSource},
};

/// The result of a run
#[derive(Debug)]
pub enum RunOutcome {
    /// The last handler's result, if the last command in the chain had a
    /// handler
    Finished(Option<Object>),

    /// An eager callback (such as `--help`) stopped the run
    Stopped(String),
}

#[derive(Debug)]
pub struct Runner {
    config: Config,
    name: String,
    signature: ObjSignature,
}

impl Runner {
    pub fn new(config: Config, name: impl Into<String>, signature: ObjSignature) -> Self {
        Self {
            config,
            name: name.into(),
            signature,
        }
    }

    /// Extract the signature from an external adapter
    pub fn from_source(
        config: Config,
        name: impl Into<String>,
        source: &impl SignatureSource,
    ) -> Result<Self, Error> {
        Ok(Self::new(config, name, source.extract()?))
    }

    #[must_use]
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /**
    Build, parse and invoke. Each handler receives the previous handler's
    result as its receiver, so a class's constructor feeds its methods. A
    command without a handler passes its receiver through unchanged.
    */
    #[instrument(level = "debug", skip_all, fields(program = %self.name))]
    pub fn run<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<RunOutcome, Error> {
        let tree = build(&mut self.config, &self.name, &self.signature)?;

        let invocations = match parse(&mut self.config, &tree, tokens)? {
            Outcome::Stopped { output, .. } => return Ok(RunOutcome::Stopped(output)),
            Outcome::Complete(invocations) => invocations,
        };

        let mut receiver: Option<Object> = None;

        for invocation in &invocations {
            let command = tree.command(invocation.command);

            if let Some(handler) = &command.handler {
                debug!(command = %command.object_path, args = %invocation.args, "invoking");

                let result = handler(receiver.as_ref(), &invocation.args).map_err(|source| {
                    Error::Invoke {
                        command: tree.display_path(&invocation.path),
                        source,
                    }
                })?;

                receiver = Some(result);
            }
        }

        Ok(RunOutcome::Finished(receiver))
    }

    /// Like [`run`](Self::run), but handles the terminal cases itself: stop
    /// output goes to stdout with exit status 0, errors go to stderr with
    /// exit status 1.
    pub fn run_or_exit<S: AsRef<str>>(mut self, tokens: &[S]) -> Option<Object> {
        match self.run(tokens) {
            Ok(RunOutcome::Finished(result)) => result,
            Ok(RunOutcome::Stopped(output)) => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{}", output.trim_end());
                let _ = out.flush();
                process::exit(0)
            }
            Err(error) => {
                let mut out = io::stderr().lock();
                let _ = writeln!(out, "error: {error}");
                let _ = writeln!(out, "\nTry '{} --help' for more information.", self.name);
                process::exit(1)
            }
        }
    }
}
