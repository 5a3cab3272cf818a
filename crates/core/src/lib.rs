pub mod config;
pub mod text;

pub use config::Config;
pub use text::{truncate_chars, truncate_with_marker};
