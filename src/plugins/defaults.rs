/*!
Injects externally loaded defaults (a config file, the environment) into a
run. The overrides are merged into the `START_ARGS_PRE_PROCESS` payload, on
top of anything an earlier callback put there, and are then layered over each
command's declared defaults by [`apply_overrides`](crate::overrides::apply_overrides).
*/

use tracing::debug;

use crate::{
    config::Config,
    events::{Scope, StartArgsPreProcess},
    overrides::Overrides,
};

pub fn register(config: &mut Config, overrides: Overrides) {
    config.on::<StartArgsPreProcess>(Scope::Any, move |start| {
        debug!(count = overrides.iter().count(), "merging config overrides");
        start.overrides.merge(&overrides);
        Ok(())
    });
}
