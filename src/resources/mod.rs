pub mod config;
pub mod faction;
pub mod world_clock;
pub mod cli;

pub use config::*;
pub use faction::*;
pub use world_clock::*;
pub use cli::*;
