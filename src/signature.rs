/*!
The signature model: a language-neutral description of a callable or class,
supplied by an external reflection adapter. The builder only ever looks at
these types; it never inspects a runtime object directly.
*/

use std::{any::Any, fmt, rc::Rc};

use itertools::Itertools;

use crate::{
    errors::{InvokeError, SignatureExtractionError},
    value::{CallArgs, Value},
};

/// An opaque value produced by a handler, such as a constructed instance.
/// It becomes the receiver of the next handler in a subcommand chain.
pub type Object = Rc<dyn Any>;

/// The callable behind a command. It receives the receiver produced by the
/// parent command (if any) and its own resolved arguments.
pub type Handler = Rc<dyn Fn(Option<&Object>, &CallArgs) -> Result<Object, InvokeError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
    Path,
}

impl ScalarKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Str => "str",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::Path => "path",
        }
    }
}

/// The declared type of a parameter, or the return type of a callable.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Scalar(ScalarKind),

    /// One of a fixed set of literal strings
    Choice(Vec<String>),

    /// A named type with a converter registered in the
    /// [`ConverterStore`](crate::convert::ConverterStore)
    Custom(String),

    /// A nested object: becomes a nested parameter group when used as a
    /// parameter type, and a source of subcommands when used as a return type
    Object(Rc<ObjSignature>),

    Sequence(Box<TypeDescriptor>),
    Optional(Box<TypeDescriptor>),

    /// Any one of the member types, tried in order
    Union(Vec<TypeDescriptor>),

    /// A fixed number of values, one per member type
    Tuple(Vec<TypeDescriptor>),

    /// No meaningful value; the default return type
    Unit,
}

impl TypeDescriptor {
    #[inline]
    #[must_use]
    pub fn sequence_of(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Sequence(Box::new(inner))
    }

    #[inline]
    #[must_use]
    pub fn optional_of(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    #[inline]
    #[must_use]
    pub fn object(signature: ObjSignature) -> Self {
        TypeDescriptor::Object(Rc::new(signature))
    }

    #[must_use]
    pub fn choice<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeDescriptor::Choice(choices.into_iter().map(Into::into).collect())
    }

    /// Strip any number of `Optional` layers.
    #[must_use]
    pub fn unwrap_optional(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDescriptor::Optional(_))
    }

    #[inline]
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(
            self.unwrap_optional(),
            TypeDescriptor::Scalar(ScalarKind::Bool)
        )
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Rc<ObjSignature>> {
        match self.unwrap_optional() {
            TypeDescriptor::Object(signature) => Some(signature),
            _ => None,
        }
    }

    /// A short human-readable name, used in help and error messages
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            TypeDescriptor::Scalar(kind) => kind.name().to_owned(),
            TypeDescriptor::Choice(choices) => format!("{{{}}}", choices.join(",")),
            TypeDescriptor::Custom(name) => name.clone(),
            TypeDescriptor::Object(signature) => signature.short_name().to_owned(),
            TypeDescriptor::Sequence(inner) => format!("list[{}]", inner.type_name()),
            TypeDescriptor::Optional(inner) => format!("{}?", inner.type_name()),
            TypeDescriptor::Union(members) => members.iter().map(TypeDescriptor::type_name).join(" | "),
            TypeDescriptor::Tuple(members) => format!(
                "({})",
                members.iter().map(TypeDescriptor::type_name).join(", ")
            ),
            TypeDescriptor::Unit => "none".to_owned(),
        }
    }
}

/// How a parameter should be exposed on the command line. `Auto` leaves the
/// decision to the classification policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParamKind {
    #[default]
    Auto,
    Argument,
    Option,
}

/// A single parameter of a callable, as extracted by reflection.
#[derive(Debug, Clone)]
pub struct ParameterSignature {
    pub name: String,
    pub ty: TypeDescriptor,
    pub default: Option<Value>,
    pub doc: String,
    pub variadic: bool,
    pub kind: ParamKind,
    pub short: Option<char>,
}

impl ParameterSignature {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            doc: String::new(),
            variadic: false,
            kind: ParamKind::Auto,
            short: None,
        }
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// A parameter is required if nothing supplies a value when the command
    /// line omits it.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.variadic && !self.ty.is_optional()
    }
}

/**
The signature of a callable or class.

`name` is the object path (for instance `demo.Trainer.fit`); event callbacks
use it to scope themselves to a particular object. When `returns` is an
[`Object`](TypeDescriptor::Object), the methods of that object become
subcommands.
*/
#[derive(Clone, Default)]
pub struct ObjSignature {
    pub name: String,
    pub doc: String,
    pub params: Vec<ParameterSignature>,
    pub methods: Vec<ObjSignature>,
    pub returns: TypeDescriptor,
    pub handler: Option<Handler>,
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        TypeDescriptor::Unit
    }
}

impl ObjSignature {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    #[must_use]
    pub fn param(mut self, param: ParameterSignature) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn method(mut self, method: ObjSignature) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn returns(mut self, returns: TypeDescriptor) -> Self {
        self.returns = returns;
        self
    }

    /// Shorthand for `returns(TypeDescriptor::object(instance))`: the methods
    /// of `instance` become subcommands.
    #[must_use]
    pub fn returns_instance(self, instance: ObjSignature) -> Self {
        self.returns(TypeDescriptor::object(instance))
    }

    #[must_use]
    pub fn handler(
        mut self,
        handler: impl Fn(Option<&Object>, &CallArgs) -> Result<Object, InvokeError> + 'static,
    ) -> Self {
        self.handler = Some(Rc::new(handler));
        self
    }

    /// The last segment of the object path
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn param_named_mut(&mut self, name: &str) -> Option<&mut ParameterSignature> {
        self.params.iter_mut().find(|param| param.name == name)
    }
}

impl fmt::Debug for ObjSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjSignature")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("methods", &self.methods)
            .field("returns", &self.returns)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .finish_non_exhaustive()
    }
}

/**
The seam to an external reflection mechanism. Anything that can describe a
callable implements this; the core never looks any further.
*/
pub trait SignatureSource {
    fn extract(&self) -> Result<ObjSignature, SignatureExtractionError>;
}

impl SignatureSource for ObjSignature {
    fn extract(&self) -> Result<ObjSignature, SignatureExtractionError> {
        Ok(self.clone())
    }
}
