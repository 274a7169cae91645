pub mod commands;
pub mod config;
pub mod context;
mod error;
pub mod resolver;

pub use error::Error;
