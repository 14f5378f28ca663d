//! Core business logic for qanda.

pub mod services;

pub use services::*;
