//! User-facing configuration surface

pub mod config;
