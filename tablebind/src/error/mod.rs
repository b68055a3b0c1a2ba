//! Error types

mod compile;
mod config;
mod filter;

pub use compile::*;
pub use config::*;
pub use filter::*;
