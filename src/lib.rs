pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;
pub mod terminal;
pub mod types;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::ChatError;
