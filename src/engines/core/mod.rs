//! Core scheduling primitives

pub mod future;
pub mod parallel;
pub mod runner;
