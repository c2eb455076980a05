//! Write operations for the jobs feature

pub mod enqueue;

pub use enqueue::{EnqueueJobCommand, EnqueueJobError};
