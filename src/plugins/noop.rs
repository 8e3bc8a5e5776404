use crate::command::{CliCallback, Flow};

/// The trigger that ends a run of list values without doing anything else
pub const SEPARATOR: &str = "--0";

/// `--0`: separates two adjacent variadic runs, as in `1 2 --0 3 4`.
#[must_use]
pub fn callback() -> CliCallback {
    CliCallback::new([SEPARATOR], "End a list of values", 0, |_, _| {
        Ok(Flow::Continue)
    })
}
