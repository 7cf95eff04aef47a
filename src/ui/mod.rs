pub mod command;
pub mod input;
pub mod layout;
pub mod render;
pub mod text_metrics;
