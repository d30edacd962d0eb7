pub mod ship;
pub mod cargo;
pub mod station;
pub mod obstacle;
pub mod navigation;
pub mod docking;
pub mod order;
pub mod controller;

pub use ship::*;
pub use cargo::*;
pub use station::*;
pub use obstacle::*;
pub use navigation::*;
pub use docking::*;
pub use order::*;
pub use controller::*;
