use bevy::prelude::*;
use crate::resources::SimClock;

/// System that advances the simulation clock on every FixedUpdate tick.
///
/// Runs last in the autopilot chain, so every controller and station in
/// one step observed the same tick.
pub fn world_tick_system(mut clock: ResMut<SimClock>) {
    clock.advance();
}
