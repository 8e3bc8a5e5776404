/*!
Named lifecycle events and the per-invocation callback registry.

Each event is a marker type implementing [`Event`], which fixes its name and
its payload type, so callbacks are statically typed:

```
use ignite::events::{EventCallbacks, PgPostCreate, Scope};

let mut events = EventCallbacks::new();
events.register::<PgPostCreate>(Scope::Any, |group| {
    group.doc.push_str(" (patched)");
    Ok(())
});
```

Callbacks run synchronously, in registration order, and mutate the payload in
place. The first failing callback aborts the firing; its error is stamped with
the event name and the payload's object path.
*/

use std::fmt;

use tracing::{debug, trace};

use crate::{
    command::Command,
    errors::CallbackError,
    group::ParameterGroup,
    overrides::Overrides,
    signature::ObjSignature,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    StartArgsPreProcess,
    SigExtract,
    PgPostCreate,
    CmdPostCreate,
    CmdPostProcess,
}

impl EventName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EventName::StartArgsPreProcess => "START_ARGS_PRE_PROCESS",
            EventName::SigExtract => "SIG_EXTRACT",
            EventName::PgPostCreate => "PG_POST_CREATE",
            EventName::CmdPostCreate => "CMD_POST_CREATE",
            EventName::CmdPostProcess => "CMD_POST_PROCESS",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payloads carry the object path that [`Scope`] filters match against.
pub trait Scoped {
    fn object_path(&self) -> &str;
}

impl Scoped for ObjSignature {
    fn object_path(&self) -> &str {
        &self.name
    }
}

impl Scoped for ParameterGroup {
    fn object_path(&self) -> &str {
        &self.object_path
    }
}

impl Scoped for Command {
    fn object_path(&self) -> &str {
        &self.object_path
    }
}

/// Restricts a callback to payloads for one object
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Any,
    Object(String),
}

impl Scope {
    pub fn object(path: impl Into<String>) -> Self {
        Scope::Object(path.into())
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Scope::Any => true,
            Scope::Object(object) => object == path,
        }
    }
}

type Callback<P> = Box<dyn FnMut(&mut P) -> Result<(), CallbackError>>;

/// A callback together with its scope
pub struct Registered<P> {
    scope: Scope,
    callback: Callback<P>,
}

impl<P> fmt::Debug for Registered<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// A lifecycle event: a name and the payload its callbacks receive.
pub trait Event {
    type Payload: Scoped;
    const NAME: EventName;

    #[doc(hidden)]
    fn slot(callbacks: &mut EventCallbacks) -> &mut Vec<Registered<Self::Payload>>;
}

macro_rules! events {
    ($(
        $(#[$meta:meta])*
        $Marker:ident => $Variant:ident, $field:ident: $Payload:ty;
    )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            pub enum $Marker {}

            impl Event for $Marker {
                type Payload = $Payload;
                const NAME: EventName = EventName::$Variant;

                fn slot(callbacks: &mut EventCallbacks) -> &mut Vec<Registered<$Payload>> {
                    &mut callbacks.$field
                }
            }
        )*

        /// The callback registry. Constructed fresh for each invocation and
        /// passed explicitly through the builder and the parser.
        #[derive(Debug, Default)]
        pub struct EventCallbacks {
            $($field: Vec<Registered<$Payload>>,)*
        }
    };
}

events! {
    /// Fired once, before any token is matched. Callbacks may rewrite the
    /// tokens, add config overrides, or stop the run.
    StartArgsPreProcess => StartArgsPreProcess, start_args: StartArgs;

    /// Fired with every signature before it is interpreted, including the
    /// signatures of nested object parameters.
    SigExtract => SigExtract, sig_extract: ObjSignature;

    /// Fired with each assembled parameter group, innermost first.
    PgPostCreate => PgPostCreate, pg_post_create: ParameterGroup;

    /// Fired with each command before its triggers are validated and its
    /// subcommands are attached.
    CmdPostCreate => CmdPostCreate, cmd_post_create: Command;

    /// Fired with each command's bound values after its tokens are scanned,
    /// before the missing-parameter check.
    CmdPostProcess => CmdPostProcess, cmd_post_process: BoundCommand;
}

impl EventCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Event>(
        &mut self,
        scope: Scope,
        callback: impl FnMut(&mut E::Payload) -> Result<(), CallbackError> + 'static,
    ) {
        E::slot(self).push(Registered {
            scope,
            callback: Box::new(callback),
        });
    }

    /// Run every matching callback for `E`, in registration order.
    pub fn fire<E: Event>(&mut self, payload: &mut E::Payload) -> Result<(), CallbackError> {
        let path = payload.object_path().to_owned();
        let callbacks = E::slot(self);

        debug!(event = %E::NAME, object = %path, count = callbacks.len(), "firing event");

        for registered in callbacks.iter_mut() {
            if !registered.scope.matches(&path) {
                trace!(event = %E::NAME, scope = ?registered.scope, "callback out of scope");
                continue;
            }

            (registered.callback)(payload).map_err(|error| error.during(E::NAME, &path))?;
        }

        Ok(())
    }
}

/// Payload of [`StartArgsPreProcess`]
#[derive(Debug, Clone)]
pub struct StartArgs {
    /// The root command's name
    pub program: String,

    /// The root command's object path
    pub object_path: String,
    pub tokens: Vec<String>,
    pub overrides: Overrides,
    stop: Option<String>,
}

impl StartArgs {
    pub(crate) fn new(
        program: impl Into<String>,
        object_path: impl Into<String>,
        tokens: Vec<String>,
    ) -> Self {
        Self {
            program: program.into(),
            object_path: object_path.into(),
            tokens,
            overrides: Overrides::new(),
            stop: None,
        }
    }

    /// Stop the run before any token is parsed; `output` is shown to the
    /// user.
    pub fn stop(&mut self, output: impl Into<String>) {
        self.stop = Some(output.into());
    }

    pub(crate) fn take_stop(&mut self) -> Option<String> {
        self.stop.take()
    }
}

impl Scoped for StartArgs {
    fn object_path(&self) -> &str {
        &self.object_path
    }
}

/// One parameter's state after scanning
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub path: Vec<String>,

    /// The value given on the command line, if any
    pub value: Option<Value>,

    /// The effective default (declared, or from a config override)
    pub default: Option<Value>,
}

impl Slot {
    #[must_use]
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }

    /// The value that will be passed on: explicit, or else the default
    #[must_use]
    pub fn resolved(&self) -> Option<&Value> {
        self.value.as_ref().or(self.default.as_ref())
    }
}

/// Payload of [`CmdPostProcess`]: a command's parameters after its tokens
/// were scanned.
#[derive(Debug, Clone)]
pub struct BoundCommand {
    pub name: String,
    pub object_path: String,

    /// Subcommand names from the root down to this command
    pub path: Vec<String>,
    pub slots: Vec<Slot>,
}

impl BoundCommand {
    fn slot(&self, path: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.path.iter().eq(path.split('.')))
    }

    /// The resolved value at a dotted path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.slot(path)?.resolved()
    }

    #[must_use]
    pub fn is_explicit(&self, path: &str) -> bool {
        self.slot(path).is_some_and(|slot| slot.value.is_some())
    }

    /// Set the value at a dotted path, as if it were given explicitly.
    /// Returns false if there's no such parameter.
    pub fn set(&mut self, path: &str, value: Value) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|slot| slot.path.iter().eq(path.split('.')))
        {
            Some(slot) => {
                slot.value = Some(value);
                true
            }
            None => false,
        }
    }
}

impl Scoped for BoundCommand {
    fn object_path(&self) -> &str {
        &self.object_path
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn group(object_path: &str) -> ParameterGroup {
        ParameterGroup {
            name: "g".into(),
            object_path: object_path.into(),
            doc: String::new(),
            prefix: None,
            members: Vec::new(),
        }
    }

    #[test]
    fn callbacks_run_in_order_and_respect_scope() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut events = EventCallbacks::new();

        for label in ["first", "second"] {
            let log = Rc::clone(&log);
            events.register::<PgPostCreate>(Scope::Any, move |group| {
                log.borrow_mut().push(format!("{label}:{}", group.object_path));
                Ok(())
            });
        }

        let scoped = Rc::clone(&log);
        events.register::<PgPostCreate>(Scope::object("demo.Model"), move |_| {
            scoped.borrow_mut().push("scoped".to_owned());
            Ok(())
        });

        events
            .fire::<PgPostCreate>(&mut group("demo.Trainer"))
            .unwrap();
        events.fire::<PgPostCreate>(&mut group("demo.Model")).unwrap();

        assert_eq!(
            *log.borrow(),
            [
                "first:demo.Trainer",
                "second:demo.Trainer",
                "first:demo.Model",
                "second:demo.Model",
                "scoped",
            ]
        );
    }

    #[test]
    fn failures_stop_the_chain_and_carry_context() {
        let ran = Rc::new(RefCell::new(false));
        let mut events = EventCallbacks::new();

        events.register::<SigExtract>(Scope::Any, |_| Err(CallbackError::new("bad signature")));

        let later = Rc::clone(&ran);
        events.register::<SigExtract>(Scope::Any, move |_| {
            *later.borrow_mut() = true;
            Ok(())
        });

        let error = events
            .fire::<SigExtract>(&mut ObjSignature::new("demo.train"))
            .unwrap_err();

        assert_eq!(error.event, Some(EventName::SigExtract));
        assert_eq!(error.path.as_deref(), Some("demo.train"));
        assert!(!*ran.borrow());
    }

    #[test]
    fn bound_command_lookup_by_dotted_path() {
        let mut bound = BoundCommand {
            name: "fit".into(),
            object_path: "demo.Trainer.fit".into(),
            path: vec!["fit".into()],
            slots: vec![Slot {
                path: vec!["model".into(), "arch".into()],
                value: None,
                default: Some(Value::from("resnet")),
            }],
        };

        assert_eq!(bound.get("model.arch"), Some(&Value::from("resnet")));
        assert!(!bound.is_explicit("model.arch"));
        assert!(bound.set("model.arch", Value::from("vit")));
        assert!(bound.is_explicit("model.arch"));
        assert!(!bound.set("model.depth", Value::Int(1)));
    }
}
