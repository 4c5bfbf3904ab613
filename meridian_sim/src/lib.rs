// meridian_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the meridian_sim crate.
pub mod prelude;

pub mod algorithms;
pub mod cli;
pub mod config;
pub mod pathgen;
pub mod plot;
pub mod sensors;
