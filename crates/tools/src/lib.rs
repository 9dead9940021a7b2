//! External capabilities the pipeline can delegate to.

pub mod fetch;

pub use fetch::{sanitize, PageFetcher, MAX_FETCH_CHARS, READ_URL_TOOL};
