//! Trait abstractions at the edges of the import pipeline.
//!
//! Hosts implement these to swap in their own transport.

pub mod fetcher;
