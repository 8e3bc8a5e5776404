#![no_std]

/*!
Low-level implementation of argument handling. Takes care of distinctions
between flags, options, and positionals, that sort of thing. No type handling
happens here, and the parser knows nothing about which options exist; callers
decide how many values an option takes through [`ArgAccess`].
*/

extern crate alloc;

mod arg;
mod populated;

use alloc::{
    borrow::ToOwned,
    format,
    string::String,
    vec::Vec,
};
use core::iter::Peekable;

pub use arg::Arg;
use populated::PopulatedStr;

/**
The [`ArgumentsParser`] type operates by passing arguments it finds into a
[`Visitor`], to be handled.
 */
pub trait Visitor<'arg> {
    type Value;

    /// A positional parameter.
    fn visit_positional(self, argument: &'arg Arg) -> Self::Value;

    /// A long option that definitely has an argument, because it was given
    /// as `--option=argument`
    fn visit_long_option(self, option: &'arg Arg, argument: &'arg Arg) -> Self::Value;

    /// A long option or flag, such as `--option`
    fn visit_long(self, option: &'arg Arg, arg: impl ArgAccess<'arg>) -> Self::Value;

    /// A short option or flag, such as `-o`
    fn visit_short(self, option: char, arg: impl ArgAccess<'arg>) -> Self::Value;
}

/**
[`ArgAccess`] allows a visitor to decide if a given option needs values,
based on the identity of the option.

Consider `--foo bar`. Is this a pair of parameters (the flag `--foo` and the
positional parameter `bar`) or a single option `--foo bar` that takes an
argument? And with `--foo a b c --bar`, how many of those belong to `--foo`?
The [`ArgumentsParser`] can't independently classify a given argument, so
instead, a visitor requests values via this trait only for options that need
them, and the parser takes care of where those values come from.
*/
pub trait ArgAccess<'arg>: Sized {
    /**
    Get a run of arguments, for as long as `accept` approves of them. This
    should only be called by options that need values; flags should simply
    ignore it, to ensure that the next command line argument can correctly be
    parsed independently. Options with a fixed number of values stop
    accepting once they have enough.

    The run always stops at a raw `--`, which is left in place to switch the
    parser into positional-only mode. For a short option, the rest of its
    cluster (`-ovalue`) is offered first; if it's rejected, the cluster is
    parsed as more shorts.
    */
    fn take_while(self, accept: impl FnMut(&'arg Arg) -> bool) -> Vec<&'arg Arg>;
}

#[derive(Debug, Clone)]
enum State<'arg> {
    Ready,
    PositionalOnly,
    ShortInProgress(&'arg PopulatedStr),
}

/**
An `ArgumentsParser` is the main entry point into `ignite_parser`. It parses
arguments in each call to `next_arg`, sending those arguments to the given
[`Visitor`]. It handles distinguishing flags, options, and positionals; logic
related to how options get their values, and the `--` separator.

The parser operates entirely on borrowed data; the ubiquitous `'arg` lifetime
refers to the borrowed command line tokens.
*/
#[derive(Debug, Clone)]
pub struct ArgumentsParser<'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    state: State<'arg>,
    args: Peekable<I>,
}

impl<'arg, I> ArgumentsParser<'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    /**
    Create a new [`ArgumentsParser`] from an iterator of tokens. This list
    should *exclude* the name of the program, which is commonly passed as the
    first argument in the list.
     */
    #[inline]
    #[must_use]
    pub fn new(args: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            state: State::Ready,
            args: args.into_iter().peekable(),
        }
    }

    /// Put `self` into a `PositionalOnly` state, then process a positional
    /// argument
    #[inline]
    fn positional_only_arg<V>(&mut self, visitor: V) -> Option<V::Value>
    where
        V: Visitor<'arg>,
    {
        debug_assert!(!matches!(self.state, State::ShortInProgress(_)));

        self.state = State::PositionalOnly;
        self.args
            .next()
            .map(Arg::new)
            .map(|arg| visitor.visit_positional(arg))
    }

    /// Put `self` into a `Ready` state, then return a StandardArgAccess
    #[inline]
    fn standard_arg(&mut self) -> StandardArgAccess<'_, 'arg, I> {
        debug_assert!(!matches!(self.state, State::PositionalOnly));

        self.state = State::Ready;
        StandardArgAccess { parent: self }
    }

    /// Put `self` into a `ShortInProgress` state, then return a
    /// ShortArgAccess.
    #[inline]
    fn short_arg(&mut self, short: &'arg PopulatedStr) -> ShortArgAccess<'_, 'arg, I> {
        debug_assert!(!matches!(self.state, State::PositionalOnly));

        self.state = State::ShortInProgress(short);
        ShortArgAccess {
            short: short.get(),
            parent: self,
        }
    }

    /// Handle getting the argument for a `-s` short option. If there is
    /// remaining content in the short, it's a candidate for the argument;
    /// otherwise, the next argument in the input args is the candidate.
    #[inline]
    fn handle_short_argument<V>(&mut self, short: &'arg PopulatedStr, visitor: V) -> V::Value
    where
        V: Visitor<'arg>,
    {
        let (option, short) = short.split_first();

        match PopulatedStr::new(short) {
            None => visitor.visit_short(option, self.standard_arg()),
            Some(short) => visitor.visit_short(option, self.short_arg(short)),
        }
    }

    pub fn next_arg<V>(&mut self, visitor: V) -> Option<V::Value>
    where
        V: Visitor<'arg>,
    {
        match self.state {
            State::Ready => match self.args.next()? {
                "--" => self.positional_only_arg(visitor),
                argument => Some(match argument.strip_prefix("--") {
                    Some(option) => match split_once(option, b'=') {
                        Some((option, argument)) => {
                            visitor.visit_long_option(Arg::new(option), Arg::new(argument))
                        }
                        None => visitor.visit_long(Arg::new(option), self.standard_arg()),
                    },
                    None => match argument.strip_prefix('-').map(PopulatedStr::new) {
                        Some(Some(short)) => self.handle_short_argument(short, visitor),
                        Some(None) => visitor.visit_positional(Arg::new("-")),
                        None => visitor.visit_positional(Arg::new(argument)),
                    },
                }),
            },
            State::PositionalOnly => self.positional_only_arg(visitor),
            State::ShortInProgress(short) => Some(self.handle_short_argument(short, visitor)),
        }
    }

    /// Consume the parser, returning every token it hasn't handed out yet.
    /// A half-processed short cluster comes back as its own `-rest` token,
    /// and positional-only mode is preserved with a leading `--`.
    pub fn into_remaining(self) -> Vec<String> {
        let mut remaining = Vec::new();

        match self.state {
            State::Ready => {}
            State::PositionalOnly => remaining.push("--".to_owned()),
            State::ShortInProgress(short) => remaining.push(format!("-{}", short.get())),
        }

        remaining.extend(self.args.map(ToOwned::to_owned));
        remaining
    }
}

/// ArgAccess implementation that gets the next argument from the list.
/// Handles logic around `--` PositionalOnly parameters.
struct StandardArgAccess<'a, 'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    parent: &'a mut ArgumentsParser<'arg, I>,
}

impl<'arg, I> ArgAccess<'arg> for StandardArgAccess<'_, 'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    fn take_while(self, mut accept: impl FnMut(&'arg Arg) -> bool) -> Vec<&'arg Arg> {
        let mut taken = Vec::new();

        while let Some(&next) = self.parent.args.peek() {
            let arg = Arg::new(next);

            if next == "--" || !accept(arg) {
                break;
            }

            self.parent.args.next();
            taken.push(arg);
        }

        taken
    }
}

/// ArgAccess implementation that gets the remainder of a short argument.
/// Handles things like `-ovalue`, which is equivalent to `-o value`.
struct ShortArgAccess<'a, 'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    short: &'arg str,
    parent: &'a mut ArgumentsParser<'arg, I>,
}

impl<'arg, I> ArgAccess<'arg> for ShortArgAccess<'_, 'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    fn take_while(self, mut accept: impl FnMut(&'arg Arg) -> bool) -> Vec<&'arg Arg> {
        debug_assert!(
            matches!(self.parent.state, State::ShortInProgress(short) if short.get() == self.short)
        );

        let first = Arg::new(self.short);

        // Rejected: leave the state alone, so the rest of the cluster is
        // parsed as more shorts.
        if !accept(first) {
            return Vec::new();
        }

        self.parent.state = State::Ready;

        let mut taken = Vec::from([first]);
        taken.extend(StandardArgAccess {
            parent: self.parent,
        }
        .take_while(accept));
        taken
    }
}

fn split_once(input: &str, delimiter: u8) -> Option<(&str, &str)> {
    memchr::memchr(delimiter, input.as_bytes()).map(|i| (&input[..i], &input[i + 1..]))
}
