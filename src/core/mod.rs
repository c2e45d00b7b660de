// src/core/mod.rs

pub mod dates;
pub mod period;
pub mod sanitize;

pub use period::Period;
