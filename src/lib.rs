pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod learning;
pub mod market;
pub mod simulation;
pub mod training;

pub use error::{ConfigError, Error, Result};
