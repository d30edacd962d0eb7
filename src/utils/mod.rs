pub mod pid;
pub mod steering;
