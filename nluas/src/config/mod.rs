//! Configuration module for the problem-solver process

pub mod types;

pub use types::*;
