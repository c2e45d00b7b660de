// src/lib.rs

#[macro_use]
pub mod macros;

pub mod cli;
pub mod config;
pub mod core;
pub mod csv;
pub mod data;
pub mod error;
pub mod specs;

pub mod consolidate;
pub mod fetch;
pub mod file;
pub mod log;
pub mod normalize;
pub mod progress;
pub mod publish;
pub mod runner;
pub mod store;

pub use error::{Error, Result};
