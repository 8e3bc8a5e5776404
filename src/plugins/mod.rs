/*!
Behavior built on the extension points rather than into the core: the eager
`--help`, `--show-bindings` and `--0` callbacks, override injection, and
trigger rewriting.
*/

pub mod bindings;
pub mod defaults;
pub mod help;
pub mod noop;
pub mod triggers;
