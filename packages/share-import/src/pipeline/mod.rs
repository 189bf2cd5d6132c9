//! Import pipeline: classification, step building, paste parsing and the
//! [`Importer`] entry points.

pub mod classify;
pub mod import;
pub mod paste;
pub mod steps;

pub use classify::{classify_text, classify_url, is_share_url, Specificity, Tally, TextClassification};
pub use import::Importer;
pub use paste::parse_pasted_text;
pub use steps::build_steps;
