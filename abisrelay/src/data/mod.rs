mod config;
pub mod bscs;

pub use config::*;
