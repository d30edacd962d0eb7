pub mod sector;
pub mod avoidance;
pub mod economy;
pub mod order_execution;
pub mod docking;
pub mod movement;
pub mod commands;
pub mod world_tick;

pub use sector::*;
pub use avoidance::*;
pub use economy::*;
pub use order_execution::*;
pub use docking::*;
pub use movement::*;
pub use commands::*;
pub use world_tick::*;
