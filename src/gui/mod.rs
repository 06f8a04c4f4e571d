pub mod app;
pub mod controls;
pub mod grid;
pub mod shortcuts;

#[cfg(test)]
mod app_test;

pub use app::*;
