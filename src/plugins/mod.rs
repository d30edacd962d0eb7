pub mod autopilot;
pub mod sector;
