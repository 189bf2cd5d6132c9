//! Data types shared across the import pipeline.

pub mod config;
pub mod conversation;
pub mod step;
