pub mod component;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod selection;

pub use component::{DynamicClient, ErrorMessage, Output, Request, Response, Token};
pub use discovery::DiscoveryClient;
pub use error::{ClientError, FetchError};
pub use executor::{ApiResponse, CallOptions, Executor};
pub use selection::{Choice, SelectionState, Settings};
