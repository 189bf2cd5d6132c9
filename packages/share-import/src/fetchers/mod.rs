//! Page fetcher implementations.
//!
//! Concrete implementations of the `PageFetcher` trait.
//!
//! # Available Fetchers
//!
//! - `HttpFetcher` - reqwest client with a browser identity and a hard timeout
//! - `MockFetcher` - canned pages and failures, for testing
//!
//! # Example
//!
//! ```rust,ignore
//! use share_import::fetchers::{HttpFetcher, PageFetcher};
//! use share_import::FetchConfig;
//!
//! let fetcher = HttpFetcher::new(FetchConfig::default())?;
//! let page = fetcher.fetch("https://claude.ai/share/abc").await?;
//! ```

mod http;
mod mock;

pub use http::HttpFetcher;
pub use mock::{MockFailure, MockFetcher};

// Re-export from traits for convenience
pub use crate::traits::fetcher::{FetchedPage, PageFetcher};
