//! # obia parallel
//!
//! Thread configuration and per-object dispatch for label-map filters.
//!
//! This crate provides:
//! - `ProcessingMode`: sequential, all-cores or fixed-size execution
//! - Index-parallel helpers (`ParallelStrategy`) used for row bands
//! - The per-object engine (`run_object_filter`) driving valuators
//!
//! Without the `parallel` feature every mode runs on the calling thread.

pub mod objects;
pub mod strategy;

pub use objects::{run_object_filter, ObjectFilter};
pub use strategy::{num_cpus, ParallelStrategy, ProcessingMode};
