pub mod grid;
pub mod screen;
pub mod types;
