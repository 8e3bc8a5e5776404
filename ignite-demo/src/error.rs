#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("malformed override {0:?}; expected key=value")]
    MalformedOverride(String),

    #[error("{method} was called without a trainer")]
    MissingReceiver { method: &'static str },

    #[error("missing argument {0:?}")]
    MissingArgument(&'static str),

    #[error("{0:?} is not a fraction like 3/4")]
    NotAFraction(String),

    #[error("fraction {0:?} has a zero denominator")]
    ZeroDenominator(String),
}
