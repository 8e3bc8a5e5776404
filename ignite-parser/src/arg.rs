use core::{fmt, mem};

/**
A single, raw argument passed in from the command line.

This type is used in two ways: to indicate long command line options, and to
indicate arguments themselves. For instance, given
`--target foo --path=bar input.txt`, `target`, `foo`, `path`, `bar`, and
`input.txt` would all be passed as [`Arg`] values to the relevant functions.

Tokens reach the parser as strings (they've usually been through a shell or
a config layer already), so an [`Arg`] is just a borrowed [`str`].
*/
#[derive(Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Arg(str);

impl Arg {
    pub const fn new(s: &str) -> &Self {
        // SAFETY: Arg is repr transparent to a str, so it's safe to
        // transmute into it.
        unsafe { mem::transmute(s) }
    }

    pub const fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Arg {
    fn eq(&self, other: &str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&str> for Arg {
    fn eq(&self, other: &&str) -> bool {
        self.0 == **other
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &self.0)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
