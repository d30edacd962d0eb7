//! Autopilot and station docking for a headless space sector simulation.
//!
//! Every craft carries an [`components::OrderController`] that flies its
//! current [`components::Order`]; stations arbitrate docking through a
//! [`components::DockingCoordinator`]. [`plugins::autopilot::AutopilotPlugin`]
//! wires both into Bevy's fixed timestep.

pub mod components;
pub mod events;
pub mod plugins;
pub mod resources;
pub mod systems;
pub mod utils;
