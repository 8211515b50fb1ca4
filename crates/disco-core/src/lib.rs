pub mod config;
pub mod error;
pub mod ir;
pub mod parse;
pub mod request;
pub mod transform;

/// Default location of the public discovery directory.
pub const DEFAULT_DIRECTORY_URL: &str = "https://discovery.googleapis.com/discovery/v1/apis";
