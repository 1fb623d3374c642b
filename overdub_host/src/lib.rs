pub mod controls;
pub mod display;
pub mod session;

pub use controls::{parse_line, Action};
